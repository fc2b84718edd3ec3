//! The host boundary.
//!
//! The host drives a provider through [`ProviderService`]: it fetches the
//! schema, configures the provider once, then calls the lifecycle
//! operations of resources and data sources with JSON state trees.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Operations a provider exposes to the host.
///
/// `read` returns `Ok(None)` when the remote object no longer exists. The
/// host then drops it from state and plans its re-creation; this is not an
/// error.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Names of the registered resources and data sources.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let schema = resource_schema(&schema, resource_type)?;
        Ok(validate(schema, &config))
    }

    /// Plan changes for a resource.
    ///
    /// The default diffs the proposed state against the prior state using
    /// the resource schema; see [`plan_from_schema`].
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let _ = config;
        let schema = self.schema();
        let schema = resource_schema(&schema, resource_type)?;
        Ok(plan_from_schema(schema, prior_state.as_ref(), proposed_state))
    }

    /// Create a new resource and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Refresh a resource; `None` means it no longer exists.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Update an existing resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (prior_state, planned_state);
        Err(ProviderError::Unimplemented(format!(
            "{} cannot be updated in place",
            resource_type
        )))
    }

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source's configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let schema = schema
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))?;
        Ok(validate(schema, &config))
    }

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError>;
}

fn resource_schema<'a>(
    schema: &'a ProviderSchema,
    resource_type: &str,
) -> Result<&'a Schema, ProviderError> {
    schema
        .resources
        .get(resource_type)
        .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
}

/// Diff a proposed state against the prior state of a resource.
///
/// - No prior state: every non-null proposed attribute is an addition.
/// - Null proposed state: every prior attribute is removed.
/// - Otherwise each configurable attribute is compared; a change to a
///   `force_new` attribute requires replacement. Computed attributes (and
///   the id) are carried over from the prior state unless the resource is
///   replaced.
pub fn plan_from_schema(schema: &Schema, prior: Option<&Value>, proposed: Value) -> PlanResult {
    let block = &schema.block;

    let Some(prior) = prior.filter(|p| !p.is_null()) else {
        let changes = proposed
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::new(k.clone(), None, Some(v.clone())))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(proposed, changes, false);
    };

    if proposed.is_null() {
        let changes = prior
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| AttributeChange::new(k.clone(), Some(v.clone()), None))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() {
            continue;
        }
        let before = prior.get(name).filter(|v| !v.is_null());
        let after = proposed.get(name).filter(|v| !v.is_null());
        if before != after {
            requires_replace |= attr.force_new;
            changes.push(AttributeChange::new(
                name.clone(),
                before.cloned(),
                after.cloned(),
            ));
        }
    }

    let mut planned = proposed;
    if !requires_replace {
        if let (Some(planned), Some(prior)) = (planned.as_object_mut(), prior.as_object()) {
            for (name, value) in prior {
                let computed = name == crate::state::ID_KEY
                    || block
                        .attributes
                        .get(name)
                        .is_some_and(|a| a.flags.is_computed_only());
                if computed {
                    planned.insert(name.clone(), value.clone());
                }
            }
        }
    }

    PlanResult::with_changes(planned, changes, requires_replace)
}
