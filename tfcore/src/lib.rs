//! tfcore - provider-side plugin framework types for Terraform providers
//!
//! The crate carries the type system, schema builders and trait surface that
//! provider crates are written against. Wire-protocol serving is not part of
//! this crate; it owns the contract between a provider implementation and the
//! plugin host.

pub mod context;
pub mod data_source;
pub mod error;
pub mod import;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod types;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfcoreError};
pub use import::{import_state_passthrough_id, join_composite_id, split_composite_id};
pub use provider::Provider;
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{Diagnostic, Dynamic, DynamicValue, PrivateStateData};
