//! Command implementations.

use crate::cli::CheckArgs;
use anyhow::Context;
use breachwatch_core::{AppConfig, ProviderCredentials, SearchRequest};
use breachwatch_provider::providers::common::build_http_client;
use breachwatch_provider::providers::{dehashed, haveibeenpwned};
use breachwatch_provider::ProviderRegistry;
use breachwatch_report::{Report, ReportBuilder};
use breachwatch_scanner::ScanOrchestrator;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Environment variable holding the Have I Been Pwned API key.
pub const HIBP_API_KEY_VAR: &str = "HIBP_API_KEY";

/// Environment variable holding the DeHashed API key.
pub const DEHASHED_API_KEY_VAR: &str = "DEHASHED_API_KEY";

/// Load configuration from `path`, or from the default location.
///
/// Environment overrides apply in both cases.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load_with_env().context("failed to load config")?,
    };
    Ok(config)
}

/// Build the search request for `args`.
///
/// Credentials come from `lookup` so callers control the environment.
pub fn build_request(
    args: &CheckArgs,
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> SearchRequest {
    let mut request = SearchRequest::for_email(args.email.trim()).with_providers(&args.providers);

    if let Some(secs) = args.timeout {
        request = request.with_timeout(Duration::from_secs(secs));
    }

    if let Some(key) = lookup(HIBP_API_KEY_VAR) {
        request = request.with_credentials(
            haveibeenpwned::NAME,
            ProviderCredentials::new().with_api_key(key),
        );
    }
    if let Some(key) = lookup(DEHASHED_API_KEY_VAR) {
        request = request.with_credentials(
            dehashed::NAME,
            ProviderCredentials::new().with_api_key(key),
        );
    }

    if args.include_pastes || config.haveibeenpwned.include_pastes {
        request = request.with_criterion(haveibeenpwned::NAME, "include_pastes", true);
    }
    if args.include_data_classes || config.haveibeenpwned.include_data_classes {
        request = request.with_criterion(haveibeenpwned::NAME, "include_data_classes", true);
    }
    if let Some(qps) = args.hibp_qps {
        request = request.with_criterion(haveibeenpwned::NAME, "queries_per_second", qps);
    }
    if let Some(query) = &args.dehashed_query {
        request = request.with_criterion(dehashed::NAME, "query", query.as_str());
    }

    request
}

/// Run a search and build its report.
pub async fn check(
    args: &CheckArgs,
    config: &AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Report> {
    if args.email.trim().is_empty() {
        anyhow::bail!("--email must not be empty");
    }

    let client = build_http_client(Some(config.search.timeout_secs))?;
    let registry = Arc::new(ProviderRegistry::from_config(client, config));
    let orchestrator = ScanOrchestrator::from_config(registry, &config.search);

    let request = build_request(args, config, lookup);
    let response = orchestrator.search(&request).await;

    let failed = response.iter().filter(|(_, result)| !result.ok).count();
    info!(
        "Search finished: {} provider(s), {} failed",
        response.len(),
        failed
    );

    Ok(ReportBuilder::new().build(&request, &response))
}

/// Print `report` as pretty JSON to `output`, or stdout.
pub fn write_report(report: &Report, output: Option<&Path>) -> anyhow::Result<()> {
    let rendered = report.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            println!("{rendered}");
        }
    }

    Ok(())
}

/// Names of every available provider.
#[must_use]
pub fn provider_names(config: &AppConfig) -> Vec<String> {
    ProviderRegistry::from_config(reqwest::Client::new(), config).list()
}
