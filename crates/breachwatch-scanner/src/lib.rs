//! Breachwatch Scanner - Search orchestration across breach providers.
//!
//! This crate fans a single [`breachwatch_core::SearchRequest`] out to every
//! requested provider and gathers the outcomes into one
//! [`breachwatch_core::SearchResponse`].
//!
//! # Features
//!
//! - Concurrent dispatch with configurable parallelism
//! - Fallback to a default provider set when a request names none
//! - Failure isolation: unknown names, construction errors, panics and
//!   deadline expiry all become ordinary failed results
//!
//! # Example
//!
//! ```rust,no_run
//! use breachwatch_core::SearchRequest;
//! use breachwatch_provider::ProviderRegistry;
//! use breachwatch_scanner::ScanOrchestrator;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let registry = Arc::new(ProviderRegistry::with_defaults(reqwest::Client::new()));
//! let orchestrator = ScanOrchestrator::new(registry).with_max_concurrent_providers(2);
//!
//! let request = SearchRequest::for_email("user@example.com")
//!     .with_providers(["haveibeenpwned", "dehashed"]);
//! let response = orchestrator.search(&request).await;
//!
//! for (name, result) in response.iter() {
//!     println!("{name}: ok={} findings={}", result.ok, result.finding_count());
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod orchestrator;

// Re-export commonly used types
pub use orchestrator::{ScanOrchestrator, DEFAULT_MAX_CONCURRENT_PROVIDERS, DEFAULT_PROVIDERS};
