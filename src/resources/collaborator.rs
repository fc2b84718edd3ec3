//! The `scalingo_collaborator` resource.
//!
//! A collaboration between a user, identified by email, and an application.
//! Both are fixed at creation: changing either replaces the collaboration.
//! Instances are imported with `<app>:<collaborator ID or email>`.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::api::{Collaborator, ScalingoApi};
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Schema};
use crate::state::{Flatten, ResourceData};
use crate::types::ImportedResource;

/// Type name registered with the host.
pub const TYPE_NAME: &str = "scalingo_collaborator";

/// Schema of the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Resource representing a collaboration between a user and an application")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "app",
            Attribute::required_string()
                .with_force_new()
                .with_description("ID or slug name of the targeted application"),
        )
        .with_attribute(
            "email",
            Attribute::required_string()
                .with_force_new()
                .with_description("Email of the collaborator to invite"),
        )
        .with_attribute(
            "username",
            Attribute::computed_string().with_description(
                "Username of the attached account once the collaboration has been accepted",
            ),
        )
        .with_attribute(
            "status",
            Attribute::computed_string()
                .with_description("Status of the collaboration (pending/accepted)"),
        )
}

/// Invite the configured email on the configured application.
#[instrument(skip(api, planned_state))]
pub async fn create(api: &dyn ScalingoApi, planned_state: Value) -> Result<Value> {
    let schema = schema();
    let mut data = ResourceData::load(&schema, planned_state)?;
    let app = data.require_str("app")?.to_string();
    let email = data.require_str("email")?.to_string();

    let collaborator = api
        .collaborator_add(&app, &email)
        .await
        .map_err(|err| ProviderError::api("add collaborator", err))?;
    info!(app = %app, id = %collaborator.id, "collaborator invited");

    data.set_id(collaborator.id.clone());
    data.set_all(refreshed(&collaborator, COMPUTED_KEYS))
        .map_err(|err| ProviderError::store("collaborator information", err))?;
    Ok(data.into_state())
}

/// Refresh the collaboration from the application's collaborator list.
///
/// Returns `None` when the collaboration no longer exists.
#[instrument(skip(api, current_state))]
pub async fn read(api: &dyn ScalingoApi, current_state: Value) -> Result<Option<Value>> {
    let schema = schema();
    let mut data = ResourceData::load(&schema, current_state)?;
    let id = data
        .id()
        .ok_or_else(|| ProviderError::Validation("collaborator state has no id".to_string()))?
        .to_string();
    let app = data.require_str("app")?.to_string();

    let collaborators = api
        .collaborators_list(&app)
        .await
        .map_err(|err| ProviderError::api("list collaborators", err))?;

    let Some(collaborator) = collaborators.into_iter().find(|c| c.id == id) else {
        warn!(app = %app, id = %id, "collaborator not found, removing it from state");
        return Ok(None);
    };

    debug!(app = %app, id = %id, status = collaborator.status.as_str(), "collaborator refreshed");
    data.set_all(refreshed(&collaborator, REFRESHED_KEYS))
        .map_err(|err| ProviderError::store("collaborator information", err))?;
    Ok(Some(data.into_state()))
}

/// Remove the collaboration.
#[instrument(skip(api, current_state))]
pub async fn delete(api: &dyn ScalingoApi, current_state: Value) -> Result<()> {
    let schema = schema();
    let data = ResourceData::load(&schema, current_state)?;
    let id = data
        .id()
        .ok_or_else(|| ProviderError::Validation("collaborator state has no id".to_string()))?;
    let app = data.require_str("app")?;

    api.collaborator_remove(app, id)
        .await
        .map_err(|err| ProviderError::api("remove collaborator", err))?;
    info!(app = %app, id = %id, "collaborator removed");
    Ok(())
}

/// Import an existing collaboration from `<app>:<collaborator ID or email>`.
#[instrument(skip(api))]
pub async fn import(api: &dyn ScalingoApi, import_id: &str) -> Result<ImportedResource> {
    let (app, needle) = parse_import_id(import_id)?;

    let collaborators = api
        .collaborators_list(app)
        .await
        .map_err(|err| ProviderError::api("list collaborators", err))?;

    let collaborator = collaborators
        .into_iter()
        .find(|c| c.email == needle || c.id == needle)
        .ok_or_else(|| {
            ProviderError::NotFound(format!("collaborator '{}' on app '{}'", needle, app))
        })?;

    let schema = schema();
    let mut data = ResourceData::new(&schema);
    data.set_id(collaborator.id.clone());
    let mut values = refreshed(&collaborator, REFRESHED_KEYS);
    values.insert("app".to_string(), Value::String(app.to_string()));
    data.set_all(values)
        .map_err(|err| ProviderError::store("collaborator information", err))?;

    info!(app = %app, id = %collaborator.id, "collaborator imported");
    Ok(ImportedResource::new(TYPE_NAME, data.into_state()))
}

fn parse_import_id(import_id: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = import_id.split(':').collect();
    match parts.as_slice() {
        [app, needle] if !app.is_empty() && !needle.is_empty() => Ok((*app, *needle)),
        _ => Err(ProviderError::InvalidImportId(import_id.to_string())),
    }
}

/// Attributes only the platform sets.
const COMPUTED_KEYS: &[&str] = &["username", "status"];
/// Attributes refreshed from the collaborator list.
const REFRESHED_KEYS: &[&str] = &["email", "username", "status"];

/// The flattened record, restricted to `keys`.
fn refreshed(collaborator: &Collaborator, keys: &[&str]) -> Map<String, Value> {
    let mut values = collaborator.flatten();
    values.retain(|key, _| keys.contains(&key.as_str()));
    values
}
