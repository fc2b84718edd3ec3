//! Managed resources.

pub mod collaborator;
