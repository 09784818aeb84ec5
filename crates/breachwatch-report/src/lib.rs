//! Breachwatch Report - Consolidated, account-centric breach reports.
//!
//! Turns a [`breachwatch_core::SearchResponse`] into a deterministic
//! [`Report`]: per-provider outcomes, a roll-up scope, and every finding
//! grouped by the account (email) it concerns.
//!
//! # Example
//!
//! ```rust
//! use breachwatch_core::{Finding, ProviderResult, SearchRequest, SearchResponse};
//! use breachwatch_report::ReportBuilder;
//! use serde_json::json;
//!
//! let request = SearchRequest::for_email("user@example.com").with_provider("haveibeenpwned");
//! let response: SearchResponse = [ProviderResult::success(
//!     "haveibeenpwned",
//!     vec![Finding::new("haveibeenpwned", "breach", "Adobe", json!({"Name": "Adobe"}))],
//! )]
//! .into_iter()
//! .collect();
//!
//! let report = ReportBuilder::new()
//!     .with_generated_at("2026-02-21T00:00:00+00:00")
//!     .build(&request, &response);
//!
//! assert_eq!(report.scope.unique_hibp_breaches, vec!["Adobe"]);
//! assert_eq!(report.account_hits[0].account, "user@example.com");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod normalize;
pub mod report;

// Re-export commonly used types
pub use normalize::{FindingDetail, NormalizedFinding, UNKNOWN_ACCOUNT};
pub use report::{
    build_report, AccountHits, ProviderHits, ProviderSummary, Report, ReportBuilder, ReportScope,
    SCHEMA_VERSION,
};
