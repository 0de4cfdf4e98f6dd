//! Shared HTTP client used by every connector.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Thin wrapper around a `reqwest::Client` built once per run with the
/// configured timeout and user agent.
#[derive(Debug, Clone)]
pub struct SourceHttp {
    client: reqwest::Client,
}

impl SourceHttp {
    /// # Errors
    ///
    /// Returns the `reqwest` error if the TLS backend cannot be initialized.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` with `params` appended as an encoded query string and return
    /// the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on an unparseable URL, a transport failure or a
    /// non-success status.
    pub(crate) async fn get_text(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse_with_params(url, params).map_err(|e| {
            FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let url_str = parsed.to_string();

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url_str,
            });
        }

        response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url_str,
                source,
            })
    }

    /// Like [`SourceHttp::get_text`], then decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Body`] if the body is not valid JSON for `T`.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let body = self.get_text(url, params).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Characters escaped in a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Percent-encode a tag or slug for use as one path segment.
pub(crate) fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Host part of `base_url`, used as the pacing key. Falls back to the raw
/// string when it does not parse.
pub(crate) fn host_of(base_url: &str) -> String {
    reqwest::Url::parse(base_url)
        .ok()
        .and_then(|u| {
            u.host_str().map(|h| match u.port() {
                Some(port) => format!("{h}:{port}"),
                None => h.to_string(),
            })
        })
        .unwrap_or_else(|| base_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_keeps_port_for_local_servers() {
        assert_eq!(host_of("https://www.reddit.com"), "www.reddit.com");
        assert_eq!(host_of("http://127.0.0.1:4312/x"), "127.0.0.1:4312");
        assert_eq!(host_of("not a url"), "not a url");
    }

    #[test]
    fn path_segments_keep_dashes_and_escape_spaces() {
        assert_eq!(encode_path_segment("stock-market"), "stock-market");
        assert_eq!(encode_path_segment("s&p 500"), "s%26p%20500");
    }
}
