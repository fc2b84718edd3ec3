//! The `scalingo_invoices` data source.
//!
//! Lists every invoice of the authenticated account, optionally keeping only
//! those whose billing month falls strictly between `after` and `before`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::api::{BillingMonth, Invoice, ScalingoApi};
use crate::error::{ProviderError, Result};
use crate::pagination::fetch_all;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::state::{Flatten, ResourceData};
use crate::time_range::is_in_time_range;

/// Type name registered with the host.
pub const TYPE_NAME: &str = "scalingo_invoices";

/// Rendering of an absent bound in the data source id.
const ZERO_DATE: &str = "0001-01-01";

fn item_block() -> Block {
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("label", Attribute::computed_string())
        .with_attribute("price", Attribute::computed_int64())
}

/// Schema of the data source.
pub fn schema() -> Schema {
    let invoice = Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("total_price", Attribute::computed_int64())
        .with_attribute("total_price_with_vat", Attribute::computed_int64())
        .with_attribute("billing_month", Attribute::computed_string())
        .with_attribute("pdf_url", Attribute::computed_string())
        .with_attribute("invoice_number", Attribute::computed_string())
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("vat_rate", Attribute::computed_int64())
        .with_block("items", NestedBlock::computed_list(item_block()))
        .with_block(
            "detailed_items",
            NestedBlock::computed_list(
                item_block().with_attribute("app", Attribute::computed_string()),
            ),
        );

    Schema::v0()
        .with_description("Invoices of the authenticated account")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "before",
            Attribute::optional_string()
                .with_description("Only keep invoices billed before this date (YYYY-MM-DD)"),
        )
        .with_attribute(
            "after",
            Attribute::optional_string()
                .with_description("Only keep invoices billed after this date (YYYY-MM-DD)"),
        )
        .with_block("invoices", NestedBlock::computed_list(invoice))
}

/// Fetch, filter, and flatten the account invoices.
#[instrument(skip(api, config))]
pub async fn read(api: &dyn ScalingoApi, config: Value) -> Result<Value> {
    let schema = schema();
    let mut data = ResourceData::load(&schema, config)?;
    let before_raw = data.get_str("before").to_string();
    let after_raw = data.get_str("after").to_string();
    let before = parse_bound("before", &before_raw)?;
    let after = parse_bound("after", &after_raw)?;

    let invoices = fetch_all(|opts| api.invoices_list(opts))
        .await
        .map_err(|err| ProviderError::api("list invoices", err))?;
    let total = invoices.len();

    let kept: Vec<Value> = invoices
        .iter()
        .filter(|invoice| {
            is_in_time_range(
                after.map(|b| b.to_datetime()),
                before.map(|b| b.to_datetime()),
                invoice.billing_month.to_datetime(),
            )
        })
        .map(flatten_invoice)
        .collect();
    debug!(total, kept = kept.len(), "filtered invoices");

    let mut values = Map::new();
    values.insert("before".to_string(), Value::String(before_raw));
    values.insert("after".to_string(), Value::String(after_raw));
    values.insert("invoices".to_string(), Value::Array(kept));
    data.set_all(values)
        .map_err(|err| ProviderError::store("invoices information", err))?;
    data.set_id(format!("{}-{}", id_part(before), id_part(after)));

    Ok(data.into_state())
}

fn parse_bound(field: &'static str, raw: &str) -> Result<Option<BillingMonth>> {
    if raw.is_empty() {
        return Ok(None);
    }
    BillingMonth::parse(raw)
        .map(Some)
        .map_err(|source| ProviderError::DateParse { field, source })
}

fn id_part(bound: Option<BillingMonth>) -> String {
    bound.map_or_else(|| ZERO_DATE.to_string(), |b| b.to_string())
}

/// State value of one invoice, with the billing month as a UTC timestamp.
fn flatten_invoice(invoice: &Invoice) -> Value {
    let mut flat = invoice.flatten();
    flat.insert(
        "billing_month".to_string(),
        Value::String(rfc3339(invoice.billing_month.to_datetime())),
    );
    Value::Object(flat)
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
