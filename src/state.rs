//! Host state handling.
//!
//! [`ResourceData`] is the view a handler gets on the state tree of one
//! resource instance: typed reads, schema-checked writes, and the `id`.
//! [`Flatten`] turns API records into state values. Every record kind maps
//! its fields explicitly, under the names its serde representation uses.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::{Collaborator, DetailedInvoiceItem, Invoice, InvoiceItem};
use crate::error::ProviderError;
use crate::schema::{AttributeType, Schema};

/// Key holding the identity of a resource instance.
pub const ID_KEY: &str = "id";

/// Errors raised when reading or writing a state tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The state handed over by the host is not an object.
    #[error("state must be an object, got {0}")]
    NotAnObject(&'static str),

    /// The key is not declared by the schema.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// The value does not match the declared type.
    #[error("attribute '{key}' expects {expected}")]
    TypeMismatch {
        /// Offending key.
        key: String,
        /// What the schema declares.
        expected: &'static str,
    },
}

/// Mutable view over the state of one resource or data source instance.
#[derive(Debug, Clone)]
pub struct ResourceData<'s> {
    schema: &'s Schema,
    values: Map<String, Value>,
}

impl<'s> ResourceData<'s> {
    /// An empty state for `schema`.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            values: Map::new(),
        }
    }

    /// Wrap a state (or configuration) received from the host.
    ///
    /// `null` is accepted as an empty state.
    pub fn from_state(schema: &'s Schema, state: Value) -> Result<Self, StateError> {
        let values = match state {
            Value::Object(values) => values,
            Value::Null => Map::new(),
            Value::Bool(_) => return Err(StateError::NotAnObject("bool")),
            Value::Number(_) => return Err(StateError::NotAnObject("number")),
            Value::String(_) => return Err(StateError::NotAnObject("string")),
            Value::Array(_) => return Err(StateError::NotAnObject("array")),
        };
        Ok(Self { schema, values })
    }

    /// Wrap a state or configuration received from the host, reporting a
    /// malformed tree as a validation error.
    pub fn load(schema: &'s Schema, state: Value) -> Result<Self, ProviderError> {
        Self::from_state(schema, state)
            .map_err(|err| ProviderError::Validation(format!("invalid state: {}", err)))
    }

    /// Identity of the instance, if one was assigned.
    pub fn id(&self) -> Option<&str> {
        self.values
            .get(ID_KEY)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Assign the identity of the instance.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.values.insert(ID_KEY.to_string(), Value::String(id.into()));
    }

    /// String value of `key`, or `""` when it is unset.
    pub fn get_str(&self, key: &str) -> &str {
        self.values.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Non-empty string value of `key`.
    pub fn require_str(&self, key: &str) -> Result<&str, ProviderError> {
        match self.get_str(key) {
            "" => Err(ProviderError::Validation(format!(
                "missing required attribute '{}'",
                key
            ))),
            value => Ok(value),
        }
    }

    /// Write several values at once.
    ///
    /// Every value is checked before any is written, so a rejected write
    /// leaves the state untouched.
    pub fn set_all(&mut self, values: Map<String, Value>) -> Result<(), StateError> {
        for (key, value) in &values {
            self.check(key, value)?;
        }
        self.values.extend(values);
        Ok(())
    }

    /// The state tree to hand back to the host.
    pub fn into_state(self) -> Value {
        Value::Object(self.values)
    }

    fn check(&self, key: &str, value: &Value) -> Result<(), StateError> {
        let block = &self.schema.block;
        let mismatch = |expected| StateError::TypeMismatch {
            key: key.to_string(),
            expected,
        };

        if let Some(attr) = block.attributes.get(key) {
            let ok = match attr.attr_type {
                AttributeType::String => value.is_string() || value.is_null(),
                AttributeType::Int64 => value.is_i64() || value.is_u64() || value.is_null(),
            };
            return if ok {
                Ok(())
            } else {
                Err(mismatch(match attr.attr_type {
                    AttributeType::String => "a string",
                    AttributeType::Int64 => "an integer",
                }))
            };
        }

        if block.blocks.contains_key(key) {
            let ok = value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object));
            return if ok {
                Ok(())
            } else {
                Err(mismatch("a list of objects"))
            };
        }

        Err(StateError::UnknownAttribute(key.to_string()))
    }
}

/// Explicit mapping of an API record into a state value.
pub trait Flatten {
    /// Field name to value, using the record's external field names.
    fn flatten(&self) -> Map<String, Value>;
}

/// Flatten a sequence of records into a state list.
pub fn flatten_list<'a, T, I>(records: I) -> Value
where
    T: Flatten + 'a,
    I: IntoIterator<Item = &'a T>,
{
    Value::Array(
        records
            .into_iter()
            .map(|record| Value::Object(record.flatten()))
            .collect(),
    )
}

fn object<const N: usize>(fields: [(&str, Value); N]) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

impl Flatten for InvoiceItem {
    fn flatten(&self) -> Map<String, Value> {
        object([
            ("id", self.id.clone().into()),
            ("label", self.label.clone().into()),
            ("price", self.price.into()),
        ])
    }
}

impl Flatten for DetailedInvoiceItem {
    fn flatten(&self) -> Map<String, Value> {
        object([
            ("id", self.id.clone().into()),
            ("label", self.label.clone().into()),
            ("price", self.price.into()),
            ("app", self.app.clone().into()),
        ])
    }
}

impl Flatten for Invoice {
    fn flatten(&self) -> Map<String, Value> {
        object([
            ("id", self.id.clone().into()),
            ("total_price", self.total_price.into()),
            ("total_price_with_vat", self.total_price_with_vat.into()),
            ("billing_month", self.billing_month.to_string().into()),
            ("pdf_url", self.pdf_url.clone().into()),
            ("invoice_number", self.invoice_number.clone().into()),
            ("state", self.state.clone().into()),
            ("vat_rate", self.vat_rate.into()),
            ("items", flatten_list(&self.items)),
            ("detailed_items", flatten_list(&self.detailed_items)),
        ])
    }
}

impl Flatten for Collaborator {
    fn flatten(&self) -> Map<String, Value> {
        object([
            ("id", self.id.clone().into()),
            ("email", self.email.clone().into()),
            ("username", self.username.clone().into()),
            ("status", self.status.as_str().into()),
            ("app_id", self.app_id.clone().into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BillingMonth, CollaboratorStatus};
    use crate::schema::{Attribute, Block, NestedBlock};
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use serde_json::json;

    fn invoice() -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            total_price: 1000,
            total_price_with_vat: 1200,
            billing_month: BillingMonth::parse("2023-02-01").unwrap(),
            pdf_url: "https://example.com/inv-1.pdf".to_string(),
            invoice_number: "2023-02-0001".to_string(),
            state: "paid".to_string(),
            vat_rate: 2000,
            items: vec![
                InvoiceItem {
                    id: "it-1".to_string(),
                    label: "Containers".to_string(),
                    price: 800,
                },
                InvoiceItem {
                    id: "it-2".to_string(),
                    label: "Addons".to_string(),
                    price: 200,
                },
            ],
            detailed_items: vec![DetailedInvoiceItem {
                id: "dit-1".to_string(),
                label: "Containers".to_string(),
                price: 800,
                app: "my-app".to_string(),
            }],
        }
    }

    fn collaborator() -> Collaborator {
        Collaborator {
            id: "abc".to_string(),
            email: "c@example.com".to_string(),
            username: "charlie".to_string(),
            status: CollaboratorStatus::Accepted,
            app_id: "app-id".to_string(),
        }
    }

    /// The explicit mapping must agree with the serde representation, and
    /// re-hydrating it must give back the record.
    fn assert_faithful<T>(record: &T)
    where
        T: Flatten + Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let flat = Value::Object(record.flatten());
        assert_eq!(flat, serde_json::to_value(record).unwrap());
        let back: T = serde_json::from_value(flat).unwrap();
        assert_eq!(&back, record);
    }

    #[test]
    fn test_flatten_matches_external_representation() {
        assert_faithful(&invoice());
        assert_faithful(&invoice().items[0]);
        assert_faithful(&invoice().detailed_items[0]);
        assert_faithful(&collaborator());
    }

    #[test]
    fn test_flatten_keeps_nested_lists() {
        let flat = invoice().flatten();
        assert_eq!(flat["items"].as_array().unwrap().len(), 2);
        assert_eq!(flat["items"][1]["label"], "Addons");
        assert_eq!(flat["detailed_items"][0]["app"], "my-app");
        assert_eq!(flat["billing_month"], "2023-02-01");
    }

    #[test]
    fn test_flatten_list_preserves_order() {
        let mut second = invoice();
        second.id = "inv-2".to_string();
        let list = flatten_list(&[invoice(), second]);
        assert_eq!(list[0]["id"], "inv-1");
        assert_eq!(list[1]["id"], "inv-2");
    }

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("app", Attribute::required_string())
            .with_attribute("status", Attribute::computed_string())
            .with_block(
                "items",
                NestedBlock::computed_list(
                    Block::new().with_attribute("price", Attribute::computed_int64()),
                ),
            )
    }

    #[test]
    fn test_from_state() {
        let schema = schema();
        let data = ResourceData::from_state(&schema, json!({"id": "abc", "app": "my-app"})).unwrap();
        assert_eq!(data.id(), Some("abc"));
        assert_eq!(data.get_str("app"), "my-app");
        assert_eq!(data.get_str("status"), "");

        let empty = ResourceData::from_state(&schema, Value::Null).unwrap();
        assert_eq!(empty.id(), None);

        assert_eq!(
            ResourceData::from_state(&schema, json!([])).unwrap_err(),
            StateError::NotAnObject("array")
        );
    }

    #[test]
    fn test_load_and_require() {
        let schema = schema();
        let data = ResourceData::load(&schema, json!({"app": "my-app"})).unwrap();
        assert_eq!(data.require_str("app").unwrap(), "my-app");
        assert!(matches!(
            data.require_str("status"),
            Err(ProviderError::Validation(_))
        ));

        let err = ResourceData::load(&schema, json!("app")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: invalid state: state must be an object, got string"
        );
    }

    #[test]
    fn test_empty_id_is_unset() {
        let schema = schema();
        let data = ResourceData::from_state(&schema, json!({"id": ""})).unwrap();
        assert_eq!(data.id(), None);
    }

    fn values(key: &str, value: Value) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert(key.to_string(), value);
        values
    }

    #[test]
    fn test_set_all_checks_schema() {
        let schema = schema();
        let mut data = ResourceData::new(&schema);

        data.set_all(values("status", json!("pending"))).unwrap();
        data.set_all(values("items", json!([{"price": 1}]))).unwrap();
        assert_eq!(
            data.set_all(values("role", json!("owner"))).unwrap_err(),
            StateError::UnknownAttribute("role".to_string())
        );
        assert!(matches!(
            data.set_all(values("status", json!(3))).unwrap_err(),
            StateError::TypeMismatch { .. }
        ));
        assert!(matches!(
            data.set_all(values("items", json!("nope"))).unwrap_err(),
            StateError::TypeMismatch { .. }
        ));

        data.set_id("abc");
        assert_eq!(
            data.into_state(),
            json!({"id": "abc", "status": "pending", "items": [{"price": 1}]})
        );
    }

    #[test]
    fn test_set_all_is_all_or_nothing() {
        let schema = schema();
        let mut data = ResourceData::new(&schema);

        let mut values = Map::new();
        values.insert("status".to_string(), json!("accepted"));
        values.insert("role".to_string(), json!("owner"));

        assert!(data.set_all(values).is_err());
        assert_eq!(data.into_state(), json!({}));
    }
}
