//! Common utilities shared across breach providers.

use crate::error::{ProviderError, Result};
use breachwatch_core::{Criteria, SearchRequest};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Identifier used when a record carries no usable label.
pub const UNKNOWN_IDENTIFIER: &str = "<unknown>";

/// Build a standard HTTP client with common timeout settings.
///
/// # Arguments
/// * `timeout_secs` - Timeout in seconds (defaults to 10 if not specified)
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(10)))
        .build()
        .map_err(|e| ProviderError::Internal {
            provider: "http".to_string(),
            message: format!("failed to create HTTP client: {e}"),
        })
}

/// Per-call timeout: the request's global override, then the provider's
/// `timeout` criteria (seconds), then `default`.
#[must_use]
pub fn resolve_timeout(request: &SearchRequest, criteria: &Criteria, default: Duration) -> Duration {
    if let Some(timeout) = request.timeout() {
        return timeout;
    }

    criteria
        .get("timeout")
        .and_then(Value::as_f64)
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(default)
}

/// The `Retry-After` header, verbatim.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<String> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// First truthy field among `keys`, rendered as a label.
#[must_use]
pub fn first_label(entry: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| entry.get(*key))
        .find(|value| breachwatch_core::is_truthy(value))
        .map(breachwatch_core::value_label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(Some(30)).is_ok());
        assert!(build_http_client(None).is_ok());
    }

    #[test]
    fn test_resolve_timeout_precedence() {
        let default = Duration::from_secs(10);
        let mut criteria = Criteria::new();
        criteria.insert("timeout".to_string(), json!(2.5));

        let request = SearchRequest::new();
        assert_eq!(
            resolve_timeout(&request, &criteria, default),
            Duration::from_millis(2500)
        );

        let request = SearchRequest::new().with_timeout(Duration::from_secs(1));
        assert_eq!(
            resolve_timeout(&request, &criteria, default),
            Duration::from_secs(1)
        );

        criteria.insert("timeout".to_string(), json!("soon"));
        assert_eq!(resolve_timeout(&SearchRequest::new(), &criteria, default), default);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(retry_after(&headers).as_deref(), Some("3"));
    }

    #[test]
    fn test_first_label_skips_falsy_values() {
        let entry = json!({"Name": "", "Title": null, "Source": "Pastebin", "Id": "x1"});
        let entry = entry.as_object().expect("object");
        assert_eq!(
            first_label(entry, &["Name", "Title", "Source", "Id"]).as_deref(),
            Some("Pastebin")
        );
        assert_eq!(first_label(entry, &["Missing"]), None);
    }
}
