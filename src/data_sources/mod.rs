//! Read-only data sources.

pub mod invoices;
