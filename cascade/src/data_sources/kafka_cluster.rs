//! Kafka cluster data source implementation

use async_trait::async_trait;
use tfcore::context::Context;
use tfcore::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource,
    DataSourceSchemaRequest, DataSourceSchemaResponse, DataSourceWithConfigure,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfcore::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfcore::types::{AttributePath, Diagnostic};

use crate::api::clusters::ClusterConfig;

#[derive(Default)]
pub struct KafkaClusterDataSource {
    provider_data: Option<crate::CascadeProviderData>,
}

impl KafkaClusterDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for KafkaClusterDataSource {
    fn type_name(&self) -> &str {
        "cascade_kafka_cluster"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a Kafka cluster by ID within an environment")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The cluster ID")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment_id", AttributeType::String)
                    .description("Environment containing the cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Human-readable name of the cluster")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud", AttributeType::String)
                    .description("Cloud provider")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Cloud region")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Cluster tier")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bootstrap_endpoint", AttributeType::String)
                    .description("Kafka bootstrap endpoint")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("http_endpoint", AttributeType::String)
                    .description("REST endpoint")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];

        for attr in ["id", "environment_id"] {
            if request.config.get_string(&AttributePath::new(attr)).is_err() {
                diagnostics.push(
                    Diagnostic::error(
                        format!("Missing {}", attr),
                        format!("The '{}' attribute is required", attr),
                    )
                    .with_attribute(AttributePath::new(attr)),
                );
            }
        }

        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let mut diagnostics = vec![];
        let mut state = request.config.clone();

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadDataSourceResponse { state, diagnostics };
            }
        };

        let (id, environment_id) = match (
            request.config.get_string(&AttributePath::new("id")),
            request
                .config
                .get_string(&AttributePath::new("environment_id")),
        ) {
            (Ok(id), Ok(env)) => (id, env),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing lookup key",
                    "Both 'id' and 'environment_id' must be set",
                ));
                return ReadDataSourceResponse { state, diagnostics };
            }
        };

        match provider_data.client.get_cluster(&id, &environment_id).await {
            Ok(cluster) => {
                let _ = state.set_string(
                    &AttributePath::new("display_name"),
                    cluster.spec.display_name,
                );
                let _ = state.set_string(&AttributePath::new("cloud"), cluster.spec.cloud);
                let _ = state.set_string(&AttributePath::new("region"), cluster.spec.region);
                let _ = state.set_string(
                    &AttributePath::new("type"),
                    cluster.spec.config.kind().to_lowercase(),
                );
                if let ClusterConfig::Dedicated { cku } = cluster.spec.config {
                    let _ = state.set_number(&AttributePath::new("cku"), cku as f64);
                }
                if let Some(endpoint) = cluster.spec.kafka_bootstrap_endpoint {
                    let _ = state.set_string(&AttributePath::new("bootstrap_endpoint"), endpoint);
                }
                if let Some(endpoint) = cluster.spec.http_endpoint {
                    let _ = state.set_string(&AttributePath::new("http_endpoint"), endpoint);
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read cluster",
                    format!("API error: {}", e),
                ));
            }
        }

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for KafkaClusterDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<crate::CascadeProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract CascadeProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the data source",
            ));
        }

        ConfigureDataSourceResponse { diagnostics }
    }
}
