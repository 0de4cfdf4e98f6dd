//! RSS 2.0 item extraction shared by the news-archive and Medium connectors.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::text::strip_html;

/// One `<item>` of an RSS channel, fields as published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    /// `<dc:creator>`, when present.
    pub creator: Option<String>,
    /// `<pubDate>` in RFC 2822 form, when present.
    pub pub_date: Option<String>,
}

/// Items that parsed, plus a reason for every `<item>` that did not.
#[derive(Debug, Default)]
pub(crate) struct RssParse {
    pub items: Vec<RssItem>,
    pub rejected: Vec<String>,
}

/// Parse an RSS XML feed, keeping at most `max_items` items.
///
/// Items without a title or link are reported in [`RssParse::rejected`]
/// instead of aborting the feed. HTML inside descriptions is stripped.
///
/// # Errors
///
/// Returns the `quick_xml` error if the document itself is malformed.
pub(crate) fn parse_rss_items(xml: &str, max_items: usize) -> Result<RssParse, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = RssParse::default();
    let mut in_item = false;
    let mut in_description = false;
    let mut current_tag = String::new();
    let mut item = RssItem::default();
    let mut creator = String::new();
    let mut pub_date = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("").to_string();
                if name == "item" {
                    in_item = true;
                    in_description = false;
                    item = RssItem::default();
                    creator.clear();
                    pub_date.clear();
                } else if name == "description" && in_item {
                    in_description = true;
                }
                current_tag = name;
            }
            Ok(Event::End(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if name == "description" {
                    in_description = false;
                }
                if name == "item" && in_item {
                    in_item = false;
                    let mut finished = std::mem::take(&mut item);
                    finished.title = finished.title.trim().to_string();
                    finished.link = finished.link.trim().to_string();
                    finished.description = strip_html(&finished.description);
                    finished.creator = Some(creator.trim().to_string()).filter(|c| !c.is_empty());
                    finished.pub_date =
                        Some(pub_date.trim().to_string()).filter(|d| !d.is_empty());

                    if finished.title.is_empty() || finished.link.is_empty() {
                        parsed
                            .rejected
                            .push("RSS item without title or link".to_string());
                    } else {
                        parsed.items.push(finished);
                        if parsed.items.len() >= max_items {
                            break;
                        }
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    let tag = field_tag(in_description, &current_tag);
                    append_field(&mut item, &mut creator, &mut pub_date, tag, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let tag = field_tag(in_description, &current_tag);
                    append_field(&mut item, &mut creator, &mut pub_date, tag, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }

    Ok(parsed)
}

/// Text nested in inline markup inside `<description>` still belongs to it.
fn field_tag(in_description: bool, current_tag: &str) -> &str {
    if in_description {
        "description"
    } else {
        current_tag
    }
}

fn append_field(
    item: &mut RssItem,
    creator: &mut String,
    pub_date: &mut String,
    tag: &str,
    text: &str,
) {
    let target = match tag {
        "title" => &mut item.title,
        "link" => &mut item.link,
        "description" => &mut item.description,
        "dc:creator" => creator,
        "pubDate" => pub_date,
        _ => return,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}
