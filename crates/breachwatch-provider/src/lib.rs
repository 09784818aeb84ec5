//! Breachwatch Provider - Breach data provider abstraction and registry.
//!
//! This crate defines the [`BreachProvider`] contract every backend
//! implements, the [`ProviderRegistry`] that maps names to constructors, and
//! the two built-in backends.
//!
//! # Features
//!
//! - **Provider Abstraction**: One async trait, one uniform result shape
//! - **Registry**: Case-insensitive name lookup, fresh instance per search
//! - **Have I Been Pwned**: Paced multi-call protocol with 404-as-empty
//! - **DeHashed**: Single query call with flexible payload extraction
//!
//! # Example
//!
//! ```rust,no_run
//! use breachwatch_core::{ProviderCredentials, SearchRequest};
//! use breachwatch_provider::ProviderRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ProviderRegistry::with_defaults(reqwest::Client::new());
//! let provider = registry.create("HaveIBeenPwned")?;
//!
//! let request = SearchRequest::for_email("user@example.com")
//!     .with_credentials(
//!         "haveibeenpwned",
//!         ProviderCredentials::new().with_api_key("my-key"),
//!     );
//!
//! let result = provider.search(&request).await;
//! println!("{} findings (ok: {})", result.finding_count(), result.ok);
//! # Ok(())
//! # }
//! ```
//!
//! # Failure Model
//!
//! Providers never return `Err` from [`BreachProvider::search`]. Validation,
//! transport, API and decode failures are all folded into a
//! [`breachwatch_core::ProviderResult`] with `ok == false`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod pacing;
pub mod provider;
pub mod providers;
pub mod registry;

// Re-export commonly used types
pub use error::{ProviderError, Result};
pub use pacing::{Clock, Pacer, TokioClock};
pub use provider::BreachProvider;
pub use providers::{DehashedProvider, DehashedQuery, HibpClient, HibpProvider};
pub use registry::{ProviderFactory, ProviderRegistry};
