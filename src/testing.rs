//! Test support for the provider.
//!
//! [`ProviderTester`] replays the call sequences the host issues around a
//! [`ProviderService`], without any transport. [`MockScalingo`] is an
//! in-memory [`ScalingoApi`] with failure injection and request recording.
//!
//! # Example
//!
//! ```ignore
//! use scalingo_provider::testing::{MockScalingo, ProviderTester};
//! use scalingo_provider::ScalingoProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_invite() {
//!     let api = MockScalingo::new().with_app("my-app");
//!     let tester = ProviderTester::new(ScalingoProvider::with_api(api));
//!
//!     let state = tester
//!         .apply("scalingo_collaborator", json!({
//!             "app": "my-app",
//!             "email": "c@example.com"
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["status"], "pending");
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::api::{
    ApiError, ApiResult, BillingMonth, Collaborator, CollaboratorStatus, Invoice, ScalingoApi,
};
use crate::error::ProviderError;
use crate::pagination::{PaginationMeta, PaginationOpts};
use crate::schema::Diagnostic;
use crate::service::ProviderService;
use crate::types::PlanResult;

/// What a configuration is validated for.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// The provider block.
    Provider,
    /// A resource type.
    Resource(&'a str),
    /// A data source type.
    DataSource(&'a str),
}

/// Host stand-in driving a provider.
///
/// Plain calls go through [`ProviderTester::provider`]; the tester only adds
/// the multi-step sequences and turns error diagnostics into [`TestError`].
pub struct ProviderTester<P> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Configure the provider, failing on any error diagnostic.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        errors_only(self.provider.configure(config).await?)
    }

    /// Validate `config` for `target`, failing on any error diagnostic.
    pub async fn validate(&self, target: Target<'_>, config: Value) -> Result<(), TestError> {
        let diagnostics = match target {
            Target::Provider => self.provider.validate_provider_config(config).await?,
            Target::Resource(name) => self.provider.validate_resource_config(name, config).await?,
            Target::DataSource(name) => {
                self.provider
                    .validate_data_source_config(name, config)
                    .await?
            },
        };
        errors_only(diagnostics)
    }

    /// Plan `config` over `prior` state; `None` plans a creation.
    pub async fn plan(
        &self,
        resource_type: &str,
        prior: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior, config.clone(), config)
            .await
    }

    /// Plan a creation, create, then refresh; returns the refreshed state.
    ///
    /// A resource missing right after its creation is reported as `NotFound`.
    pub async fn apply(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan(resource_type, None, config).await?;
        let created = self
            .provider
            .create(resource_type, plan.planned_state)
            .await?;

        self.provider
            .read(resource_type, created)
            .await?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("{} missing right after creation", resource_type))
            })
    }

    /// Plan the removal of `state`, then delete it.
    pub async fn destroy(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider
            .plan(resource_type, Some(state.clone()), Value::Null, Value::Null)
            .await?;
        self.provider.delete(resource_type, state).await
    }
}

/// Failure of a tester call.
#[derive(Debug, Error)]
pub enum TestError {
    /// The provider answered with error diagnostics.
    #[error("{} error diagnostic(s): {}", .0.len(), summaries(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The provider call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn errors_only(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attribute) => format!("{} (at {})", d.summary, attribute),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that `plan` creates the resource in place.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "creation plan has no changes");
    assert!(!plan.requires_replace, "creation plan requires replacement");
}

/// Assert that `plan` leaves the resource untouched.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected no changes, got {:?}",
        changed_paths(plan)
    );
}

/// Assert that `plan` replaces the resource and that `attribute` changes.
pub fn assert_plan_replaces(plan: &PlanResult, attribute: &str) {
    assert!(plan.requires_replace, "plan does not require replacement");
    assert!(
        changed_paths(plan).contains(&attribute),
        "'{}' is not changed by the plan, changed: {:?}",
        attribute,
        changed_paths(plan)
    );
}

/// Assert that an error diagnostic summary contains `needle`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], needle: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(needle)),
        "no error mentions '{}' in: {}",
        needle,
        summaries(diagnostics)
    );
}

// =========================================================================
// In-memory API
// =========================================================================

/// An invoice with no items billed on `billing_month` (`YYYY-MM-DD`).
///
/// # Panics
///
/// Panics if `billing_month` is not a valid date.
pub fn invoice(id: &str, billing_month: &str) -> Invoice {
    let billing_month = match BillingMonth::parse(billing_month) {
        Ok(month) => month,
        Err(err) => panic!("invalid billing month '{}': {}", billing_month, err),
    };
    Invoice {
        id: id.to_string(),
        total_price: 1000,
        total_price_with_vat: 1200,
        billing_month,
        pdf_url: format!("https://example.com/invoices/{}.pdf", id),
        invoice_number: id.to_uppercase(),
        state: "paid".to_string(),
        vat_rate: 2000,
        items: Vec::new(),
        detailed_items: Vec::new(),
    }
}

#[derive(Debug, Default)]
struct MockState {
    invoices: Vec<Invoice>,
    failing_invoice_page: Option<u32>,
    invoice_requests: Vec<PaginationOpts>,
    apps: BTreeMap<String, Vec<Collaborator>>,
    next_id: u64,
}

/// In-memory Scalingo account.
///
/// Invoices are served in pages of the requested size. Collaborator calls
/// against an unknown application fail with `NotFound`, as the platform does.
#[derive(Debug, Default)]
pub struct MockScalingo {
    state: Mutex<MockState>,
}

impl MockScalingo {
    /// An empty account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve these invoices, in this order.
    pub fn with_invoices(self, invoices: Vec<Invoice>) -> Self {
        self.lock().invoices = invoices;
        self
    }

    /// Fail every request for invoice page `page`.
    pub fn fail_invoice_page(self, page: u32) -> Self {
        self.lock().failing_invoice_page = Some(page);
        self
    }

    /// Register an application with no collaborators.
    pub fn with_app(self, app: &str) -> Self {
        self.lock().apps.entry(app.to_string()).or_default();
        self
    }

    /// Register a collaborator, creating the application if needed.
    pub fn with_collaborator(self, app: &str, collaborator: Collaborator) -> Self {
        self.lock()
            .apps
            .entry(app.to_string())
            .or_default()
            .push(collaborator);
        self
    }

    /// Mark the invitation of `email` as accepted by `username`.
    pub fn accept(&self, app: &str, email: &str, username: &str) {
        let mut state = self.lock();
        let found = state
            .apps
            .get_mut(app)
            .and_then(|collaborators| collaborators.iter_mut().find(|c| c.email == email));
        if let Some(collaborator) = found {
            collaborator.username = username.to_string();
            collaborator.status = CollaboratorStatus::Accepted;
        }
    }

    /// Current collaborators of `app`.
    pub fn collaborators(&self, app: &str) -> Vec<Collaborator> {
        self.lock().apps.get(app).cloned().unwrap_or_default()
    }

    /// Every invoice page requested so far, in order.
    pub fn invoice_requests(&self) -> Vec<PaginationOpts> {
        self.lock().invoice_requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn app_not_found(app: &str) -> ApiError {
    ApiError::NotFound {
        resource: format!("app {}", app),
    }
}

#[async_trait]
impl ScalingoApi for MockScalingo {
    async fn invoices_list(
        &self,
        opts: PaginationOpts,
    ) -> ApiResult<(Vec<Invoice>, PaginationMeta)> {
        let mut state = self.lock();
        state.invoice_requests.push(opts);
        if state.failing_invoice_page == Some(opts.page) {
            return Err(ApiError::api(500, "internal error"));
        }

        let per_page = opts.per_page.max(1) as usize;
        let total_count = state.invoices.len();
        let total_pages = total_count.div_ceil(per_page) as u32;
        let start = (opts.page.max(1) as usize - 1) * per_page;
        let page = state
            .invoices
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect();

        let meta = PaginationMeta {
            current_page: opts.page,
            prev_page: (opts.page > 1).then(|| opts.page - 1),
            next_page: (opts.page < total_pages).then(|| opts.page + 1),
            total_pages,
            total_count: total_count as u64,
        };
        Ok((page, meta))
    }

    async fn collaborators_list(&self, app: &str) -> ApiResult<Vec<Collaborator>> {
        self.lock()
            .apps
            .get(app)
            .cloned()
            .ok_or_else(|| app_not_found(app))
    }

    async fn collaborator_add(&self, app: &str, email: &str) -> ApiResult<Collaborator> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("collaborator-{}", state.next_id);

        let collaborators = state.apps.get_mut(app).ok_or_else(|| app_not_found(app))?;
        if collaborators.iter().any(|c| c.email == email) {
            return Err(ApiError::api(422, "email has already been invited"));
        }

        let collaborator = Collaborator {
            id,
            email: email.to_string(),
            username: "n/a".to_string(),
            status: CollaboratorStatus::Pending,
            app_id: format!("{}-id", app),
        };
        collaborators.push(collaborator.clone());
        Ok(collaborator)
    }

    async fn collaborator_remove(&self, app: &str, collaborator_id: &str) -> ApiResult<()> {
        let mut state = self.lock();
        let collaborators = state.apps.get_mut(app).ok_or_else(|| app_not_found(app))?;
        let before = collaborators.len();
        collaborators.retain(|c| c.id != collaborator_id);
        if collaborators.len() == before {
            return Err(ApiError::NotFound {
                resource: format!("collaborator {}", collaborator_id),
            });
        }
        Ok(())
    }
}
