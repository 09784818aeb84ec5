//! Consolidated report assembly.

use crate::normalize::{
    is_non_empty, normalize_finding, FindingDetail, NormalizedFinding, DEHASHED_PROVIDER,
    HIBP_PROVIDER,
};
use breachwatch_core::{value_label, ProviderResult, Result, SearchRequest, SearchResponse};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Version of the report layout.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Account-centric view of one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Report layout version
    pub schema_version: String,
    /// Generation timestamp (RFC 3339)
    pub generated_at: String,
    /// Subject of the search
    pub target_email: Option<String>,
    /// Providers as requested, duplicates included
    pub providers_requested: Vec<String>,
    /// Outcome per provider
    pub provider_results: BTreeMap<String, ProviderSummary>,
    /// Roll-up across all providers
    pub scope: ReportScope,
    /// Hits grouped by account, accounts ascending
    pub account_hits: Vec<AccountHits>,
}

/// Outcome of one provider, without its findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    /// Whether the provider succeeded
    pub ok: bool,
    /// HTTP status of the failing call
    pub status_code: Option<u16>,
    /// Failure message
    pub error: Option<String>,
    /// Number of findings reported
    pub finding_count: usize,
}

/// Roll-up across all providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportScope {
    /// Findings across all providers
    pub total_findings: usize,
    /// Number of distinct accounts with at least one hit
    pub accounts_with_hits: usize,
    /// Findings per provider
    pub provider_hit_counts: BTreeMap<String, usize>,
    /// Distinct breach names from the paced provider
    pub unique_hibp_breaches: Vec<String>,
    /// Distinct data classes from the paced provider
    pub hibp_leaked_data_classes: Vec<String>,
    /// Distinct leaked field names from the query provider
    pub dehashed_leaked_fields: Vec<String>,
}

/// Hits for one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountHits {
    /// Lower-cased email, or `<unknown>`
    pub account: String,
    /// Hits across all providers
    pub total_hits: usize,
    /// Hits per provider, providers ascending
    pub providers: BTreeMap<String, ProviderHits>,
}

/// Hits for one account from one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderHits {
    /// Number of findings
    pub hit_count: usize,
    /// Findings in discovery order
    pub findings: Vec<NormalizedFinding>,
}

impl Report {
    /// Serialize as compact JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize into a JSON value.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<&ProviderResult> for ProviderSummary {
    fn from(result: &ProviderResult) -> Self {
        Self {
            ok: result.ok,
            status_code: result.status_code,
            error: result.error.clone(),
            finding_count: result.finding_count(),
        }
    }
}

/// Builds a [`Report`] from a request and its response.
///
/// Building is deterministic: the same inputs and timestamp always produce
/// the same report.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    generated_at: Option<String>,
}

impl ReportBuilder {
    /// Create a builder that stamps reports with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed timestamp instead of the current time.
    #[must_use]
    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    /// Build the report.
    #[must_use]
    pub fn build(&self, request: &SearchRequest, response: &SearchResponse) -> Report {
        let generated_at = self
            .generated_at
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false));

        let mut provider_results = BTreeMap::new();
        let mut provider_hit_counts = BTreeMap::new();
        let mut total_findings = 0;

        for (name, result) in response.iter() {
            provider_results.insert(name.to_string(), ProviderSummary::from(result));
            provider_hit_counts.insert(name.to_string(), result.finding_count());
            total_findings += result.finding_count();
        }

        let mut accounts: BTreeMap<String, BTreeMap<String, ProviderHits>> = BTreeMap::new();
        let mut hibp_breaches = BTreeSet::new();
        let mut hibp_data_classes = BTreeSet::new();
        let mut dehashed_fields = BTreeSet::new();

        for (name, result) in response.iter() {
            for finding in &result.findings {
                let (finding_accounts, normalized) =
                    normalize_finding(finding, request.target_email());

                match (name, &normalized.detail) {
                    (HIBP_PROVIDER, FindingDetail::Breach(detail)) => {
                        if is_non_empty(&detail.scope.breach_name) {
                            hibp_breaches.insert(value_label(&detail.scope.breach_name));
                        }
                        hibp_data_classes.extend(
                            detail
                                .leaked_data
                                .data_classes
                                .iter()
                                .filter(|item| is_non_empty(item))
                                .map(value_label),
                        );
                    }
                    (DEHASHED_PROVIDER, detail) => {
                        dehashed_fields.extend(detail.leaked_fields().iter().cloned());
                    }
                    _ => {}
                }

                for account in finding_accounts {
                    let hits = accounts
                        .entry(account)
                        .or_default()
                        .entry(name.to_string())
                        .or_default();
                    hits.hit_count += 1;
                    hits.findings.push(normalized.clone());
                }
            }
        }

        let account_hits: Vec<AccountHits> = accounts
            .into_iter()
            .map(|(account, providers)| AccountHits {
                total_hits: providers.values().map(|hits| hits.hit_count).sum(),
                account,
                providers,
            })
            .collect();

        debug!(
            providers = provider_results.len(),
            accounts = account_hits.len(),
            total_findings,
            "built consolidated report"
        );

        Report {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at,
            target_email: request.target_email().map(ToString::to_string),
            providers_requested: request.providers().to_vec(),
            provider_results,
            scope: ReportScope {
                total_findings,
                accounts_with_hits: account_hits.len(),
                provider_hit_counts,
                unique_hibp_breaches: hibp_breaches.into_iter().collect(),
                hibp_leaked_data_classes: hibp_data_classes.into_iter().collect(),
                dehashed_leaked_fields: dehashed_fields.into_iter().collect(),
            },
            account_hits,
        }
    }
}

/// Build a report, stamping it with `generated_at` or the current time.
#[must_use]
pub fn build_report(
    request: &SearchRequest,
    response: &SearchResponse,
    generated_at: Option<String>,
) -> Report {
    let builder = match generated_at {
        Some(generated_at) => ReportBuilder::new().with_generated_at(generated_at),
        None => ReportBuilder::new(),
    };
    builder.build(request, response)
}
