//! The Scalingo provider.
//!
//! [`ScalingoProvider`] registers the `scalingo_collaborator` resource and
//! the `scalingo_invoices` data source, builds the API client once at
//! configure time, and routes every host call to its handler.

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{info, instrument};

use crate::api::{ScalingoApi, ScalingoClient};
use crate::config::ProviderConfig;
use crate::data_sources::invoices;
use crate::error::{ProviderError, Result};
use crate::resources::collaborator;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::ImportedResource;

/// Provider for the Scalingo platform.
///
/// The API client is set once, either by `configure` or at construction by
/// [`ScalingoProvider::with_api`], and then shared by every handler.
#[derive(Default)]
pub struct ScalingoProvider {
    api: OnceLock<Arc<dyn ScalingoApi>>,
}

impl std::fmt::Debug for ScalingoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalingoProvider")
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl ScalingoProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider already bound to `api`; `configure` will be rejected.
    pub fn with_api(api: impl ScalingoApi + 'static) -> Self {
        Self::with_shared_api(Arc::new(api))
    }

    /// A provider bound to a shared `api`.
    pub fn with_shared_api(api: Arc<dyn ScalingoApi>) -> Self {
        Self {
            api: OnceLock::from(api),
        }
    }

    /// Whether an API client is available.
    pub fn is_configured(&self) -> bool {
        self.api.get().is_some()
    }

    fn api(&self) -> Result<&dyn ScalingoApi> {
        self.api
            .get()
            .map(|api| api.as_ref())
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }
}

fn unknown(type_name: &str) -> ProviderError {
    ProviderError::UnknownResource(type_name.to_string())
}

#[async_trait::async_trait]
impl ProviderService for ScalingoProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(collaborator::TYPE_NAME, collaborator::schema())
            .with_data_source(invoices::TYPE_NAME, invoices::schema())
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        if self.is_configured() {
            return Err(ProviderError::Configuration(
                "provider is already configured".to_string(),
            ));
        }

        let config = match ProviderConfig::resolve(&config) {
            Ok(config) => config,
            Err(diagnostics) => return Ok(diagnostics),
        };

        let client = ScalingoClient::new(&config).map_err(|err| {
            ProviderError::Configuration(format!("fail to build API client: {}", err))
        })?;
        self.api.set(Arc::new(client)).map_err(|_| {
            ProviderError::Configuration("provider is already configured".to_string())
        })?;

        info!(
            api_url = %config.api_url,
            auth_api_url = %config.auth_api_url,
            "provider configured"
        );
        Ok(vec![])
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value> {
        match resource_type {
            collaborator::TYPE_NAME => collaborator::create(self.api()?, planned_state).await,
            other => Err(unknown(other)),
        }
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>> {
        match resource_type {
            collaborator::TYPE_NAME => collaborator::read(self.api()?, current_state).await,
            other => Err(unknown(other)),
        }
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<()> {
        match resource_type {
            collaborator::TYPE_NAME => collaborator::delete(self.api()?, current_state).await,
            other => Err(unknown(other)),
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>> {
        match resource_type {
            collaborator::TYPE_NAME => Ok(vec![collaborator::import(self.api()?, id).await?]),
            other => Err(unknown(other)),
        }
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value> {
        match data_source_type {
            invoices::TYPE_NAME => invoices::read(self.api()?, config).await,
            other => Err(unknown(other)),
        }
    }
}
