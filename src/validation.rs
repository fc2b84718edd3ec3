//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`] before
//! any remote call is made, so that configuration mistakes are reported as
//! diagnostics on the offending attribute.
//!
//! # Example
//!
//! ```
//! use scalingo_provider::schema::{Attribute, Schema};
//! use scalingo_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("app", Attribute::required_string())
//!     .with_attribute("email", Attribute::required_string());
//!
//! let diagnostics = validate(&schema, &json!({"app": "my-app", "email": "c@example.com"}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"app": 42, "email": "c@example.com"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("app".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Block, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes and computed blocks are skipped
/// - Attribute types must match the schema
/// - Keys the schema does not declare are rejected
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let mut diagnostic =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", type_name(value)));
            if !path.is_empty() {
                diagnostic = diagnostic.with_attribute(path);
            }
            diagnostics.push(diagnostic);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        if nested.computed {
            continue;
        }
        let block_path = join_path(path, name);
        match obj.get(name) {
            None | Some(Value::Null) => {},
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    validate_block(&nested.block, item, &format!("{}.{}", block_path, i), diagnostics);
                }
            },
            Some(other) => diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", block_path))
                    .with_detail(format!("Got {}", type_name(other)))
                    .with_attribute(block_path),
            ),
        }
    }

    for key in obj.keys() {
        if key != "id" && !block.declares(key) {
            let key_path = join_path(path, key);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", key_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(key_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let matches = match attr.attr_type {
                AttributeType::String => v.is_string(),
                AttributeType::Int64 => v.is_i64() || v.is_u64(),
            };
            if !matches {
                let expected = match attr.attr_type {
                    AttributeType::String => "string",
                    AttributeType::Int64 => "int64",
                };
                diagnostics.push(
                    Diagnostic::error(format!("Invalid type for '{}'", path))
                        .with_detail(format!("Expected {}, got {}", expected, type_name(v)))
                        .with_attribute(path),
                );
            }
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NestedBlock;
    use serde_json::json;

    fn collaborator_like() -> Schema {
        Schema::v0()
            .with_attribute("app", Attribute::required_string().with_force_new())
            .with_attribute("email", Attribute::required_string().with_force_new())
            .with_attribute("status", Attribute::computed_string())
    }

    #[test]
    fn test_valid_config() {
        let schema = collaborator_like();
        assert!(is_valid(
            &schema,
            &json!({"app": "my-app", "email": "c@example.com"})
        ));
        assert!(validate_result(&schema, &json!({"app": "a", "email": "b", "id": "c"})).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&collaborator_like(), &json!({"app": "my-app"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing required attribute 'email'");
        assert_eq!(diagnostics[0].attribute, Some("email".to_string()));
    }

    #[test]
    fn test_null_required_is_missing() {
        let diagnostics = validate(
            &collaborator_like(),
            &json!({"app": "my-app", "email": null}),
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_wrong_type() {
        let diagnostics = validate(&collaborator_like(), &json!({"app": 1, "email": true}));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.is_error()));
    }

    #[test]
    fn test_computed_values_are_not_validated() {
        let schema = Schema::v0()
            .with_attribute("before", Attribute::optional_string())
            .with_block(
                "invoices",
                NestedBlock::computed_list(
                    Block::new().with_attribute("total_price", Attribute::computed_int64()),
                ),
            );

        let diagnostics = validate(
            &schema,
            &json!({"before": "2023-03-01", "invoices": "whatever"}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_argument() {
        let diagnostics = validate(
            &collaborator_like(),
            &json!({"app": "a", "email": "b", "role": "owner"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("role".to_string()));
    }

    #[test]
    fn test_non_object_root() {
        let diagnostics = validate(&collaborator_like(), &json!("nope"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(diagnostics[0].attribute.is_none());
    }
}
