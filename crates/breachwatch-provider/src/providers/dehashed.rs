//! DeHashed (v2 search) provider implementation.

use crate::error::{ProviderError, Result};
use crate::provider::BreachProvider;
use crate::providers::common::{self, UNKNOWN_IDENTIFIER};
use async_trait::async_trait;
use breachwatch_core::{
    category, criteria_text, value_label, Criteria, Finding, ProviderResult,
    SearchRequest, DEFAULT_USER_AGENT,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry name of this provider.
pub const NAME: &str = "dehashed";

/// Default search endpoint.
pub const DEFAULT_BASE_URL: &str = breachwatch_core::DEFAULT_DEHASHED_BASE_URL;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u64 = breachwatch_core::DEFAULT_DEHASHED_PAGE_SIZE;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const ENTRY_KEYS: [&str; 4] = ["entries", "results", "records", "items"];

/// JSON body of a search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DehashedQuery {
    /// DeHashed query expression, e.g. `email:user@example.com`
    pub query: String,
    /// 1-based page number
    pub page: u64,
    /// Records per page
    pub size: u64,
    /// Interpret the query as a regular expression
    pub regex: bool,
    /// Allow wildcards in the query
    pub wildcard: bool,
    /// Ask the API to de-duplicate records
    pub de_dupe: bool,
}

/// DeHashed provider.
pub struct DehashedProvider {
    client: Client,
    base_url: String,
    default_page_size: u64,
    default_timeout: Duration,
    default_user_agent: String,
}

impl DehashedProvider {
    /// Create a provider sharing `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            default_timeout: DEFAULT_TIMEOUT,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the search endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Page size used when criteria don't set `size`.
    #[must_use]
    pub fn with_default_page_size(mut self, page_size: u64) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Per-call timeout used when neither request nor criteria set one.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// User agent used when credentials carry none.
    #[must_use]
    pub fn with_default_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.default_user_agent = user_agent.into();
        self
    }

    /// Build the request body for `request`, validating every option.
    pub fn build_query(&self, request: &SearchRequest) -> Result<DehashedQuery> {
        let credentials = request.credentials(NAME);
        let criteria = request.criteria(NAME);

        if credentials.api_key().is_none() {
            return Err(ProviderError::Validation(format!(
                "{NAME} provider requires an api_key."
            )));
        }

        let query = criteria_text(criteria, "query")
            .or_else(|| request.target_email().map(|email| format!("email:{email}")))
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "{NAME} provider requires target_email or criteria query."
                ))
            })?;

        Ok(DehashedQuery {
            query,
            page: positive_integer(criteria, "page", 1)?,
            size: positive_integer(criteria, "size", self.default_page_size)?,
            regex: flag(criteria, "regex")?,
            wildcard: flag(criteria, "wildcard")?,
            de_dupe: flag(criteria, "de_dupe")?,
        })
    }

    /// Locate the record list in a search payload.
    ///
    /// Looks at `entries`, `results`, `records` and `items` at the top level,
    /// then under a `data` object, then at `data` itself when it is a list.
    #[must_use]
    pub fn extract_entries(payload: &Value) -> &[Value] {
        let Some(object) = payload.as_object() else {
            return &[];
        };

        if let Some(entries) = find_entry_list(object) {
            return entries;
        }

        match object.get("data") {
            Some(Value::Object(data)) => find_entry_list(data).map_or(&[], Vec::as_slice),
            Some(Value::Array(entries)) => entries,
            _ => &[],
        }
    }

    /// Turn a search payload into `leak_record` findings.
    #[must_use]
    pub fn normalize_entries(payload: &Value) -> Vec<Finding> {
        Self::extract_entries(payload)
            .iter()
            .map(|entry| match entry {
                Value::Object(record) => {
                    let identifier = common::first_label(record, &["email", "username", "id"])
                        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string());
                    Finding::new(NAME, category::LEAK_RECORD, identifier, entry.clone())
                }
                other => Finding::new(
                    NAME,
                    category::LEAK_RECORD,
                    value_label(other),
                    json!({ "value": other }),
                ),
            })
            .collect()
    }

    async fn post_query(&self, request: &SearchRequest, query: &DehashedQuery) -> ProviderResult {
        let credentials = request.credentials(NAME);
        let criteria = request.criteria(NAME);
        let timeout = common::resolve_timeout(request, criteria, self.default_timeout);
        let user_agent = credentials
            .user_agent
            .as_deref()
            .unwrap_or(&self.default_user_agent);

        debug!(url = %self.base_url, page = query.page, size = query.size, "calling dehashed API");

        let mut builder = self
            .client
            .post(&self.base_url)
            .timeout(timeout)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, user_agent)
            .json(query);
        if let Some(api_key) = credentials.api_key() {
            builder = builder.header("DeHashed-Api-Key", api_key.expose());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                return ProviderError::Transport {
                    provider: NAME.to_string(),
                    message: format!("Unable to reach {NAME} API: {e}"),
                }
                .into_result(NAME);
            }
        };

        let status = response.status().as_u16();
        let retry_after = common::retry_after(response.headers());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return ProviderError::Transport {
                    provider: NAME.to_string(),
                    message: format!("Unable to reach {NAME} API: {e}"),
                }
                .into_result(NAME);
            }
        };
        let parsed = serde_json::from_str::<Value>(&body);

        if status >= 400 {
            let payload = parsed.unwrap_or_else(|_| json!({ "raw_text": body }));
            return ProviderError::Api {
                provider: NAME.to_string(),
                status,
                message: error_message(status, &payload),
                retry_after,
            }
            .into_result(NAME)
            .with_raw(Some(payload));
        }

        match parsed {
            Ok(payload) => {
                let findings = Self::normalize_entries(&payload);
                info!(provider = NAME, findings = findings.len(), "search completed");
                ProviderResult::success(NAME, findings).with_raw(Some(payload))
            }
            Err(e) => {
                warn!(provider = NAME, status, error = %e, "undecodable response payload");
                ProviderError::Decode {
                    provider: NAME.to_string(),
                    status: Some(status),
                    message: format!("failed to decode {NAME} response payload"),
                }
                .into_result(NAME)
                .with_raw(Some(json!({ "raw_text": body })))
            }
        }
    }
}

/// Error message for a failed call: the payload's `error` or `message`
/// field when present, else a generic status line.
#[must_use]
pub fn error_message(status: u16, payload: &Value) -> String {
    payload
        .as_object()
        .and_then(|object| common::first_label(object, &["error", "message"]))
        .unwrap_or_else(|| format!("{NAME} request failed (HTTP {status})"))
}

fn find_entry_list(object: &Map<String, Value>) -> Option<&Vec<Value>> {
    ENTRY_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
}

fn positive_integer(criteria: &Criteria, key: &str, default: u64) -> Result<u64> {
    match criteria.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_u64().filter(|n| *n > 0).ok_or_else(|| {
            ProviderError::Validation(format!(
                "{NAME} provider {key} must be a positive integer."
            ))
        }),
    }
}

fn flag(criteria: &Criteria, key: &str) -> Result<bool> {
    match criteria.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ProviderError::Validation(format!(
            "{NAME} provider {key} must be a boolean."
        ))),
    }
}

#[async_trait]
impl BreachProvider for DehashedProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self, request: &SearchRequest) -> Result<()> {
        self.build_query(request).map(|_| ())
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult {
        match self.build_query(request) {
            Ok(query) => {
                let result = self.post_query(request, &query).await;
                if !result.ok {
                    warn!(
                        provider = NAME,
                        status = ?result.status_code,
                        error = result.error.as_deref().unwrap_or_default(),
                        "search failed"
                    );
                }
                result
            }
            Err(e) => {
                warn!(provider = NAME, error = %e, "request rejected");
                e.into_result(NAME)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breachwatch_core::ProviderCredentials;

    fn provider() -> DehashedProvider {
        DehashedProvider::new(Client::new())
    }

    fn request_with_key() -> SearchRequest {
        SearchRequest::for_email("user@example.com")
            .with_credentials(NAME, ProviderCredentials::new().with_api_key("dh-key"))
    }

    fn validation_message(request: &SearchRequest) -> String {
        provider()
            .validate(request)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_default_query() {
        let query = provider().build_query(&request_with_key()).expect("query");
        assert_eq!(
            query,
            DehashedQuery {
                query: "email:user@example.com".to_string(),
                page: 1,
                size: 25,
                regex: false,
                wildcard: false,
                de_dupe: false,
            }
        );
        assert_eq!(
            serde_json::to_value(&query).expect("serialize"),
            json!({
                "query": "email:user@example.com",
                "page": 1,
                "size": 25,
                "regex": false,
                "wildcard": false,
                "de_dupe": false
            })
        );
    }

    #[test]
    fn test_criteria_override_query() {
        let request = SearchRequest::new()
            .with_credentials(NAME, ProviderCredentials::new().with_api_key("dh-key"))
            .with_criterion(NAME, "query", "username:alice")
            .with_criterion(NAME, "page", 3)
            .with_criterion(NAME, "size", 100)
            .with_criterion(NAME, "wildcard", true);
        let query = provider()
            .with_default_page_size(50)
            .build_query(&request)
            .expect("query");
        assert_eq!(query.query, "username:alice");
        assert_eq!(query.page, 3);
        assert_eq!(query.size, 100);
        assert!(query.wildcard);
        assert!(!query.regex);
    }

    #[test]
    fn test_configured_page_size() {
        let query = provider()
            .with_default_page_size(50)
            .build_query(&request_with_key())
            .expect("query");
        assert_eq!(query.size, 50);
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            validation_message(&SearchRequest::for_email("user@example.com")),
            "dehashed provider requires an api_key."
        );

        let request = SearchRequest::new()
            .with_credentials(NAME, ProviderCredentials::new().with_api_key("dh-key"));
        assert_eq!(
            validation_message(&request),
            "dehashed provider requires target_email or criteria query."
        );

        let request = request_with_key().with_criterion(NAME, "page", 0);
        assert_eq!(
            validation_message(&request),
            "dehashed provider page must be a positive integer."
        );

        let request = request_with_key().with_criterion(NAME, "size", "25");
        assert_eq!(
            validation_message(&request),
            "dehashed provider size must be a positive integer."
        );

        let request = request_with_key().with_criterion(NAME, "de_dupe", "yes");
        assert_eq!(
            validation_message(&request),
            "dehashed provider de_dupe must be a boolean."
        );
    }

    #[test]
    fn test_extract_entries_locations() {
        let top = json!({"entries": [{"id": 1}]});
        assert_eq!(DehashedProvider::extract_entries(&top).len(), 1);

        let nested = json!({"data": {"records": [{"id": 1}, {"id": 2}]}});
        assert_eq!(DehashedProvider::extract_entries(&nested).len(), 2);

        let data_list = json!({"data": [{"id": 1}, {"id": 2}, {"id": 3}]});
        assert_eq!(DehashedProvider::extract_entries(&data_list).len(), 3);

        let not_a_list = json!({"entries": {"id": 1}, "total": 4});
        assert!(DehashedProvider::extract_entries(&not_a_list).is_empty());

        assert!(DehashedProvider::extract_entries(&json!([{"id": 1}])).is_empty());
    }

    #[test]
    fn test_normalize_entries_identifiers() {
        let payload = json!({
            "entries": [
                {"email": ["first@example.com", "second@example.com"], "username": "alice"},
                {"email": "", "username": "bob"},
                {"id": 42},
                {"password": "hunter2"},
                "loose value",
            ]
        });
        let findings = DehashedProvider::normalize_entries(&payload);
        let identifiers: Vec<&str> = findings.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(
            identifiers,
            vec![
                "first@example.com, second@example.com",
                "bob",
                "42",
                "<unknown>",
                "loose value"
            ]
        );
        assert!(findings.iter().all(|f| f.category == "leak_record"));
        assert_eq!(findings[4].attributes, json!({"value": "loose value"}));
    }

    #[test]
    fn test_error_message_prefers_payload() {
        assert_eq!(error_message(401, &json!({"error": "Invalid API key"})), "Invalid API key");
        assert_eq!(error_message(400, &json!({"message": "Bad query"})), "Bad query");
        assert_eq!(
            error_message(500, &json!({"raw_text": "oops"})),
            "dehashed request failed (HTTP 500)"
        );
        assert_eq!(
            error_message(502, &json!([1, 2])),
            "dehashed request failed (HTTP 502)"
        );
    }
}
