//! Scalingo API boundary.
//!
//! [`ScalingoApi`] lists the calls the provider needs. [`ScalingoClient`] is
//! the HTTP implementation; tests use
//! [`MockScalingo`](crate::testing::MockScalingo) instead.

mod client;
mod error;
mod models;

pub use client::{ScalingoClient, DEFAULT_API_URL, DEFAULT_AUTH_URL};
pub use error::ApiError;
pub use models::{
    BillingMonth, Collaborator, CollaboratorStatus, DetailedInvoiceItem, Invoice, InvoiceItem,
    BILLING_MONTH_DATE_FORMAT,
};

use async_trait::async_trait;

use crate::pagination::{PaginationMeta, PaginationOpts};

/// Result type alias for API calls.
pub type ApiResult<T> = core::result::Result<T, ApiError>;

/// Calls the provider makes against the Scalingo platform.
///
/// Implementations are shared by every handler of a configured provider and
/// must be usable concurrently.
#[async_trait]
pub trait ScalingoApi: Send + Sync {
    /// List one page of the account invoices.
    async fn invoices_list(&self, opts: PaginationOpts)
        -> ApiResult<(Vec<Invoice>, PaginationMeta)>;

    /// List the collaborators of an application.
    async fn collaborators_list(&self, app: &str) -> ApiResult<Vec<Collaborator>>;

    /// Invite `email` to collaborate on an application.
    async fn collaborator_add(&self, app: &str, email: &str) -> ApiResult<Collaborator>;

    /// Remove a collaborator from an application.
    async fn collaborator_remove(&self, app: &str, collaborator_id: &str) -> ApiResult<()>;
}
