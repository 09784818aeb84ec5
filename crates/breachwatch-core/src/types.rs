//! Request, response and finding types shared by every breachwatch crate.
//!
//! All of these values are created fresh for a single search and discarded
//! once the caller has consumed the response.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Option bag handed to a single provider (`{"include_pastes": true, ...}`).
pub type Criteria = Map<String, Value>;

/// Well-known finding categories produced by the built-in providers.
pub mod category {
    /// A breach the subject's account appears in.
    pub const BREACH: &str = "breach";
    /// A paste the subject's account appears in.
    pub const PASTE: &str = "paste";
    /// A data class known to the breach catalogue.
    pub const DATA_CLASS: &str = "data_class";
    /// A raw leaked record returned by a search API.
    pub const LEAK_RECORD: &str = "leak_record";
}

/// Normalize a provider name: trimmed and lower-cased.
#[must_use]
pub fn normalize_provider_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Truthiness of an untyped option value.
///
/// `null`, `false`, zero, and empty strings, arrays or objects are falsy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Render a JSON value as a human-readable label.
///
/// Strings are returned verbatim, arrays are joined with `", "`, anything
/// else uses its JSON text.
#[must_use]
pub fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_label).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Look up a criteria key, returning its label only when the value is truthy.
#[must_use]
pub fn criteria_text(criteria: &Criteria, key: &str) -> Option<String> {
    criteria
        .get(key)
        .filter(|value| is_truthy(value))
        .map(value_label)
}

/// Look up a boolean-ish criteria flag. Missing keys are `false`.
#[must_use]
pub fn criteria_flag(criteria: &Criteria, key: &str) -> bool {
    criteria.get(key).is_some_and(is_truthy)
}

/// Provider API key. Zeroized on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Credentials for a single provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    /// API key sent in the provider's credential header
    pub api_key: Option<ApiKey>,
    /// Account email, for providers that authenticate with one
    pub account_email: Option<String>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Provider-specific keys that have no dedicated field
    pub extras: Map<String, Value>,
}

impl ProviderCredentials {
    /// Create empty credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<ApiKey>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the account email.
    #[must_use]
    pub fn with_account_email(mut self, email: impl Into<String>) -> Self {
        self.account_email = Some(email.into());
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a provider-specific extra.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Build credentials from an unstructured JSON value.
    ///
    /// `null` yields empty credentials. For an object, `api_key`,
    /// `account_email` (or its alias `email`) and `user_agent` populate the
    /// dedicated fields; an `extras` object and every other key are merged
    /// into [`extras`](Self::extras), top-level keys taking precedence.
    ///
    /// # Errors
    /// Returns a validation error for non-object input, a non-object
    /// `extras`, or a dedicated field that is not a string.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut data = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => {
                return Err(CoreError::Validation(
                    "provider credentials must be an object or null".to_string(),
                ))
            }
        };

        let mut extras = match data.remove("extras") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(CoreError::Validation(
                    "provider credentials extras must be an object".to_string(),
                ))
            }
        };

        let api_key = take_string(&mut data, "api_key")?;
        let email_alias = take_string(&mut data, "email")?;
        let account_email = if data.contains_key("account_email") {
            take_string(&mut data, "account_email")?
        } else {
            email_alias
        };
        let user_agent = take_string(&mut data, "user_agent")?;

        extras.extend(data);

        Ok(Self {
            api_key: api_key.map(ApiKey::new),
            account_email,
            user_agent,
            extras,
        })
    }

    /// The API key, if present and not blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

fn take_string(data: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match data.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(CoreError::Validation(format!(
            "provider credentials field `{key}` must be a string"
        ))),
    }
}

/// A single logical breach lookup, dispatched to one or more providers.
///
/// Provider names are trimmed and lower-cased on the way in, so lookups are
/// case-insensitive. Missing criteria or credentials resolve to empty values.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    target_email: Option<String>,
    providers: Vec<String>,
    criteria_by_provider: BTreeMap<String, Criteria>,
    credentials_by_provider: BTreeMap<String, ProviderCredentials>,
    timeout: Option<Duration>,
}

impl SearchRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request for a target email.
    #[must_use]
    pub fn for_email(email: impl Into<String>) -> Self {
        Self::new().with_target_email(email)
    }

    /// Set the target email.
    #[must_use]
    pub fn with_target_email(mut self, email: impl Into<String>) -> Self {
        let email = email.into();
        self.target_email = if email.trim().is_empty() {
            None
        } else {
            Some(email)
        };
        self
    }

    /// Append a provider to the dispatch list.
    #[must_use]
    pub fn with_provider(mut self, name: &str) -> Self {
        self.providers.push(normalize_provider_name(name));
        self
    }

    /// Append several providers to the dispatch list.
    #[must_use]
    pub fn with_providers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.providers
            .extend(names.into_iter().map(|n| normalize_provider_name(n.as_ref())));
        self
    }

    /// Replace the criteria for a provider.
    #[must_use]
    pub fn with_criteria(mut self, provider: &str, criteria: Criteria) -> Self {
        self.criteria_by_provider
            .insert(normalize_provider_name(provider), criteria);
        self
    }

    /// Set a single criteria key for a provider.
    #[must_use]
    pub fn with_criterion(
        mut self,
        provider: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.criteria_by_provider
            .entry(normalize_provider_name(provider))
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Replace the credentials for a provider.
    #[must_use]
    pub fn with_credentials(mut self, provider: &str, credentials: ProviderCredentials) -> Self {
        self.credentials_by_provider
            .insert(normalize_provider_name(provider), credentials);
        self
    }

    /// Set a global per-call timeout overriding provider defaults.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The primary subject of the search.
    #[must_use]
    pub fn target_email(&self) -> Option<&str> {
        self.target_email.as_deref()
    }

    /// Requested providers, normalized, in request order (duplicates kept).
    #[must_use]
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Requested providers with duplicates removed, first occurrence wins.
    #[must_use]
    pub fn distinct_providers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for name in &self.providers {
            if !seen.contains(&name.as_str()) {
                seen.push(name.as_str());
            }
        }
        seen
    }

    /// Criteria for a provider, or an empty bag.
    #[must_use]
    pub fn criteria(&self, provider: &str) -> &Criteria {
        static EMPTY: OnceLock<Criteria> = OnceLock::new();
        self.criteria_by_provider
            .get(&normalize_provider_name(provider))
            .unwrap_or_else(|| EMPTY.get_or_init(Criteria::new))
    }

    /// Credentials for a provider, or empty credentials.
    #[must_use]
    pub fn credentials(&self, provider: &str) -> &ProviderCredentials {
        static EMPTY: OnceLock<ProviderCredentials> = OnceLock::new();
        self.credentials_by_provider
            .get(&normalize_provider_name(provider))
            .unwrap_or_else(|| EMPTY.get_or_init(ProviderCredentials::default))
    }

    /// Global timeout override.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// One atomic piece of evidence produced by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Provider that produced the finding
    pub provider: String,
    /// Finding category (see [`category`])
    pub category: String,
    /// Human-meaningful label
    pub identifier: String,
    /// Raw provider-specific data
    pub attributes: Value,
}

impl Finding {
    /// Create a finding.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        category: impl Into<String>,
        identifier: impl Into<String>,
        attributes: Value,
    ) -> Self {
        Self {
            provider: provider.into(),
            category: category.into(),
            identifier: identifier.into(),
            attributes,
        }
    }
}

/// Complete outcome of querying one provider.
///
/// `findings` may be non-empty when `ok` is `false`; in that case it holds
/// whatever was collected before the failure and must not be treated as
/// complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Provider name
    pub provider: String,
    /// Whether every step of the provider protocol succeeded
    pub ok: bool,
    /// Findings collected so far
    pub findings: Vec<Finding>,
    /// HTTP status of the failing call, if any
    pub status_code: Option<u16>,
    /// Human-readable failure message
    pub error: Option<String>,
    /// Retry hint from the provider, passed through verbatim
    pub retry_after: Option<String>,
    /// Raw payload kept for diagnostics
    pub raw: Option<Value>,
}

impl ProviderResult {
    /// A successful result.
    #[must_use]
    pub fn success(provider: impl Into<String>, findings: Vec<Finding>) -> Self {
        Self {
            provider: provider.into(),
            ok: true,
            findings,
            status_code: None,
            error: None,
            retry_after: None,
            raw: None,
        }
    }

    /// A failed result with no findings.
    #[must_use]
    pub fn failure(provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ok: false,
            findings: Vec::new(),
            status_code: None,
            error: Some(error.into()),
            retry_after: None,
            raw: None,
        }
    }

    /// Attach partial findings.
    #[must_use]
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Attach an HTTP status.
    #[must_use]
    pub fn with_status_code(mut self, status_code: Option<u16>) -> Self {
        self.status_code = status_code;
        self
    }

    /// Attach a retry hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Option<String>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Attach the raw payload.
    #[must_use]
    pub fn with_raw(mut self, raw: Option<Value>) -> Self {
        self.raw = raw;
        self
    }

    /// Number of findings collected.
    #[must_use]
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }
}

/// Results of one search, keyed by normalized provider name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    results: BTreeMap<String, ProviderResult>,
}

impl SearchResponse {
    /// Create an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result for a provider, replacing any previous entry.
    pub fn insert(&mut self, provider: &str, result: ProviderResult) {
        self.results
            .insert(normalize_provider_name(provider), result);
    }

    /// Result for a provider.
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&ProviderResult> {
        self.results.get(&normalize_provider_name(provider))
    }

    /// Iterate results in provider-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderResult)> {
        self.results.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// Number of provider entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no provider was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FromIterator<ProviderResult> for SearchResponse {
    fn from_iter<I: IntoIterator<Item = ProviderResult>>(iter: I) -> Self {
        let mut response = Self::new();
        for result in iter {
            let name = result.provider.clone();
            response.insert(&name, result);
        }
        response
    }
}
