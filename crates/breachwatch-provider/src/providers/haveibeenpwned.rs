//! Have I Been Pwned (v3) provider implementation.
//!
//! The HIBP API enforces a hard per-key rate ceiling, so every outbound call
//! made by one invocation goes through a shared [`Pacer`]. A 404 means "no
//! records of this kind" and is treated as an empty result.

use crate::error::{ProviderError, Result};
use crate::pacing::{Clock, Pacer, TokioClock};
use crate::provider::BreachProvider;
use crate::providers::common::{self, UNKNOWN_IDENTIFIER};
use async_trait::async_trait;
use breachwatch_core::{
    category, criteria_flag, criteria_text, value_label, ApiKey, Criteria, Finding,
    ProviderResult, SearchRequest, DEFAULT_USER_AGENT,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Registry name of this provider.
pub const NAME: &str = "haveibeenpwned";

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = breachwatch_core::DEFAULT_HIBP_BASE_URL;

/// Default pacing rate.
pub const DEFAULT_QUERIES_PER_SECOND: f64 = breachwatch_core::DEFAULT_HIBP_QUERIES_PER_SECOND;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin HIBP v3 API client. One instance serves one provider invocation.
pub struct HibpClient {
    client: Client,
    base_url: String,
    api_key: Option<ApiKey>,
    user_agent: String,
    timeout: Duration,
}

impl HibpClient {
    /// Create a client against `base_url` (which must end with `/`).
    #[must_use]
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<ApiKey>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Breaches an account appears in, optionally filtered by domain.
    pub async fn account_breaches(&self, email: &str, domain: Option<&str>) -> Result<Value> {
        let mut url = format!(
            "{}breachedaccount/{}",
            self.base_url,
            urlencoding::encode(email)
        );
        if let Some(domain) = domain {
            url.push_str(&format!("?domain={}", urlencoding::encode(domain)));
        }
        self.get_json(&url).await
    }

    /// Pastes an account appears in.
    pub async fn account_pastes(&self, email: &str) -> Result<Value> {
        let url = format!("{}pasteaccount/{}", self.base_url, urlencoding::encode(email));
        self.get_json(&url).await
    }

    /// The catalogue of data classes.
    pub async fn data_classes(&self) -> Result<Value> {
        let url = format!("{}dataclasses/", self.base_url);
        self.get_json(&url).await
    }

    /// All breaches of a domain.
    pub async fn domain_breaches(&self, domain: &str) -> Result<Value> {
        let url = format!("{}breaches/?domain={}", self.base_url, urlencoding::encode(domain));
        self.get_json(&url).await
    }

    /// A single breach by name.
    pub async fn breach(&self, name: &str) -> Result<Value> {
        let url = format!("{}breach/{}", self.base_url, urlencoding::encode(name));
        self.get_json(&url).await
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(%url, "calling HIBP API");

        let mut builder = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("hibp-api-key", api_key.expose());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider: NAME.to_string(),
                message: format!("Unable to reach HIBP API: {e}"),
            })?;

        let status = response.status().as_u16();
        if let Some(message) = error_message(status) {
            return Err(ProviderError::Api {
                provider: NAME.to_string(),
                status,
                message,
                retry_after: common::retry_after(response.headers()),
            });
        }

        // A body that stops arriving is a transport failure, not a decode one.
        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Transport {
                provider: NAME.to_string(),
                message: format!("Unable to reach HIBP API: {e}"),
            })?;
        serde_json::from_slice(&body).map_err(|_| ProviderError::Decode {
            provider: NAME.to_string(),
            status: Some(status),
            message: "Unknown issue encountered while parsing the response payload.".to_string(),
        })
    }
}

/// Human message for an error status, or `None` below 400.
#[must_use]
pub fn error_message(status: u16) -> Option<String> {
    let message = match status {
        400 => "400 - Bad request - Invalid account specified".to_string(),
        401 => "401 - Unauthorized - Provide a valid HIBP API key and user agent".to_string(),
        403 => "403 - Forbidden - Request is forbidden".to_string(),
        404 => "404 - Not found - No account match".to_string(),
        429 => "429 - Rate limit exceeded - The rate limit for the API has been reached. \
                Please try again later"
            .to_string(),
        500.. => "5XX - Server error - The server returned an error".to_string(),
        400..=499 => format!("Unexpected client error (HTTP {status})"),
        _ => return None,
    };
    Some(message)
}

/// What one invocation will fetch, resolved from the request.
#[derive(Debug, Clone)]
struct SearchPlan {
    email: String,
    domain: Option<String>,
    include_pastes: bool,
    include_data_classes: bool,
    min_interval: Duration,
}

/// Have I Been Pwned provider.
pub struct HibpProvider {
    client: Client,
    clock: Arc<dyn Clock>,
    base_url: String,
    default_queries_per_second: f64,
    default_timeout: Duration,
    default_user_agent: String,
}

impl HibpProvider {
    /// Create a provider sharing `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            clock: Arc::new(TokioClock::new()),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_queries_per_second: DEFAULT_QUERIES_PER_SECOND,
            default_timeout: DEFAULT_TIMEOUT,
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Override the API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    /// Use a custom clock for pacing.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pacing rate used when criteria don't set `queries_per_second`.
    #[must_use]
    pub fn with_default_queries_per_second(mut self, queries_per_second: f64) -> Self {
        self.default_queries_per_second = queries_per_second;
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

    fn resolve_min_interval(&self, criteria: &Criteria) -> Result<Duration> {
        let queries_per_second = match criteria.get("queries_per_second") {
            None | Some(Value::Null) => self.default_queries_per_second,
            Some(Value::Number(n)) => n.as_f64().ok_or_else(not_a_number)?,
            Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| not_a_number())?,
            Some(_) => return Err(not_a_number()),
        };

        if !queries_per_second.is_finite() {
            return Err(not_a_number());
        }
        if queries_per_second <= 0.0 {
            return Err(ProviderError::Validation(format!(
                "{NAME} provider queries_per_second must be greater than 0."
            )));
        }

        Pacer::interval_for_rate(queries_per_second).ok_or_else(|| {
            ProviderError::Validation(format!(
                "{NAME} provider queries_per_second is too small."
            ))
        })
    }

    fn plan(&self, request: &SearchRequest) -> Result<SearchPlan> {
        let credentials = request.credentials(NAME);
        let criteria = request.criteria(NAME);

        if credentials.api_key().is_none() {
            return Err(ProviderError::Validation(format!(
                "{NAME} provider requires an api_key."
            )));
        }

        let email = criteria_text(criteria, "email")
            .or_else(|| request.target_email().map(ToString::to_string))
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "{NAME} provider requires target_email or criteria email."
                ))
            })?;

        Ok(SearchPlan {
            email,
            domain: criteria_text(criteria, "domain"),
            include_pastes: criteria_flag(criteria, "include_pastes"),
            include_data_classes: criteria_flag(criteria, "include_data_classes"),
            min_interval: self.resolve_min_interval(criteria)?,
        })
    }

    fn build_client(&self, request: &SearchRequest) -> HibpClient {
        let credentials = request.credentials(NAME);
        let criteria = request.criteria(NAME);
        HibpClient::new(
            self.client.clone(),
            self.base_url.clone(),
            credentials.api_key().cloned(),
            credentials
                .user_agent
                .clone()
                .unwrap_or_else(|| self.default_user_agent.clone()),
            common::resolve_timeout(request, criteria, self.default_timeout),
        )
    }

    /// Turn a list payload into findings. Non-list payloads yield nothing.
    #[must_use]
    pub fn normalize_items(provider: &str, category: &str, payload: &Value) -> Vec<Finding> {
        let Some(items) = payload.as_array() else {
            return Vec::new();
        };

        items
            .iter()
            .map(|item| match item {
                Value::Object(entry) => {
                    let identifier = common::first_label(entry, &["Name", "Title", "Source", "Id"])
                        .unwrap_or_else(|| UNKNOWN_IDENTIFIER.to_string());
                    Finding::new(provider, category, identifier, item.clone())
                }
                other => Finding::new(
                    provider,
                    category,
                    value_label(other),
                    json!({ "value": other }),
                ),
            })
            .collect()
    }

    async fn run(
        client: &HibpClient,
        plan: &SearchPlan,
        pacer: &mut Pacer,
        raw: &mut Map<String, Value>,
        findings: &mut Vec<Finding>,
    ) -> Result<()> {
        let breaches = not_found_as_empty(
            pacer
                .paced(|| client.account_breaches(&plan.email, plan.domain.as_deref()))
                .await,
        )?;
        findings.extend(Self::normalize_items(NAME, category::BREACH, &breaches));
        raw.insert("breaches".to_string(), breaches);

        if plan.include_pastes {
            let pastes =
                not_found_as_empty(pacer.paced(|| client.account_pastes(&plan.email)).await)?;
            findings.extend(Self::normalize_items(NAME, category::PASTE, &pastes));
            raw.insert("pastes".to_string(), pastes);
        }

        if plan.include_data_classes {
            let data_classes =
                not_found_as_empty(pacer.paced(|| client.data_classes()).await)?;
            findings.extend(Self::normalize_items(
                NAME,
                category::DATA_CLASS,
                &data_classes,
            ));
            raw.insert("data_classes".to_string(), data_classes);
        }

        Ok(())
    }
}

fn not_a_number() -> ProviderError {
    ProviderError::Validation(format!(
        "{NAME} provider queries_per_second must be a number."
    ))
}

fn not_found_as_empty(result: Result<Value>) -> Result<Value> {
    match result {
        Err(e) if e.is_not_found() => Ok(Value::Array(Vec::new())),
        other => other,
    }
}

#[async_trait]
impl BreachProvider for HibpProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn validate(&self, request: &SearchRequest) -> Result<()> {
        self.plan(request).map(|_| ())
    }

    async fn search(&self, request: &SearchRequest) -> ProviderResult {
        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(provider = NAME, error = %e, "request rejected");
                return e.into_result(NAME);
            }
        };

        let client = self.build_client(request);
        let mut pacer = Pacer::new(self.clock.clone(), plan.min_interval);
        let mut raw = Map::new();
        let mut findings = Vec::new();

        match Self::run(&client, &plan, &mut pacer, &mut raw, &mut findings).await {
            Ok(()) => {
                info!(provider = NAME, findings = findings.len(), "search completed");
                ProviderResult::success(NAME, findings).with_raw(Some(Value::Object(raw)))
            }
            Err(e) => {
                warn!(
                    provider = NAME,
                    error = %e,
                    partial_findings = findings.len(),
                    "search failed"
                );
                let raw = (!raw.is_empty()).then_some(Value::Object(raw));
                e.into_result(NAME).with_findings(findings).with_raw(raw)
            }
        }
    }
}
