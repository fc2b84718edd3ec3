//! Scalingo provider
//!
//! An infrastructure provider for the [Scalingo](https://scalingo.com)
//! platform. It exposes:
//!
//! - the **`scalingo_collaborator`** resource, which invites a user on an
//!   application and tracks the invitation until it is accepted;
//! - the **`scalingo_invoices`** data source, which lists the account
//!   invoices, optionally restricted to a billing period.
//!
//! # Overview
//!
//! The host drives the provider through [`ProviderService`]. Every call
//! carries JSON state trees checked against the [`schema`] of the targeted
//! type. Handlers talk to the platform through the [`ScalingoApi`] trait,
//! implemented over HTTP by [`ScalingoClient`] and in memory by
//! [`testing::MockScalingo`].
//!
//! # Quick Start
//!
//! ```ignore
//! use scalingo_provider::{ProviderService, ScalingoProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     scalingo_provider::init_logging();
//!
//!     let provider = ScalingoProvider::new();
//!     // Falls back to SCALINGO_API_TOKEN when api_token is not set.
//!     let diagnostics = provider.configure(json!({})).await?;
//!     assert!(diagnostics.is_empty());
//!
//!     let invoices = provider
//!         .read_data_source("scalingo_invoices", json!({"after": "2023-01-01"}))
//!         .await?;
//!     println!("{}", invoices["invoices"]);
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! See [`config`] for the provider options and their environment variables.
//! Logs are written to stderr and filtered with `RUST_LOG`; see [`logging`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod pagination;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod state;
pub mod testing;
pub mod time_range;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use api::{ApiError, ScalingoApi, ScalingoClient};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use pagination::{fetch_all, PaginationMeta, PaginationOpts, PAGE_SIZE};
pub use provider::ScalingoProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use state::{Flatten, ResourceData};
pub use time_range::is_in_time_range;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
