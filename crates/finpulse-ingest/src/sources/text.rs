//! Plain-text cleanup shared by the connectors.

/// Strip HTML tags from a string and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip tags, then decode entities (`&amp;`, `&#39;`, `&nbsp;`).
pub(crate) fn html_to_text(html: &str) -> String {
    let stripped = strip_html(html);
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max` characters of `text`, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// News aggregators append " - Publisher" to headlines; keep the headline.
pub(crate) fn headline_without_publisher(title: &str) -> &str {
    title.split(" - ").next().unwrap_or(title).trim()
}
