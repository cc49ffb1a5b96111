//! Provider trait and related types
//!
//! A provider owns its configuration (endpoint, credentials) and hands out
//! resource and data source instances through factories. The provider_data
//! returned from configure is passed to every instance's configure call.

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for resource instances; the host creates one instance per
/// operation and configures it with the provider data.
pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ResourceWithConfigure> + Send + Sync>;

/// Factory for data source instances.
pub type DataSourceFactory = Box<dyn Fn() -> Box<dyn DataSourceWithConfigure> + Send + Sync>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name (e.g., "cascade")
    fn type_name(&self) -> &str;

    /// Called to get the provider configuration schema
    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called once per host session with the practitioner's provider block.
    /// Build API clients here and return them via provider_data.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Registered resource types, keyed by type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;

    /// Registered data source types, keyed by type name
    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Opaque data handed to every resource/data source configure call
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}
