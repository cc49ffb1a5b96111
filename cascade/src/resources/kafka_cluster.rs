//! Kafka cluster resource implementation
//!
//! Create blocks until the cluster reports PROVISIONED; dedicated clusters
//! can take a long time to come up, so the poll window is generous. Only
//! display_name and cku may change after provisioning.

use async_trait::async_trait;
use std::time::Duration;
use tfcore::context::Context;
use tfcore::import::{join_composite_id, split_composite_id};
use tfcore::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceSchemaRequest,
    ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfcore::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfcore::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::clusters::{
    ClusterConfig, CreateClusterRequest, CreateClusterSpec, EnvironmentRef, KafkaCluster,
    UpdateClusterRequest, UpdateClusterSpec, PHASE_PROVISIONED, PHASE_PROVISIONING,
};
use crate::api::wait::{wait_for_state, StateChangeConf};
use crate::api::ApiError;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(3 * 60 * 60);
const PROVISION_POLL_INTERVAL: Duration = Duration::from_secs(10);

const VALID_TYPES: [&str; 3] = ["basic", "standard", "dedicated"];

#[derive(Default)]
pub struct KafkaClusterResource {
    provider_data: Option<crate::CascadeProviderData>,
}

impl KafkaClusterResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn cluster_config_from(
        config: &DynamicValue,
    ) -> Result<ClusterConfig, Diagnostic> {
        let cluster_type = config
            .get_string(&AttributePath::new("type"))
            .map_err(|_| Diagnostic::error("Missing type", "The 'type' attribute is required"))?;

        match cluster_type.as_str() {
            "basic" => Ok(ClusterConfig::Basic),
            "standard" => Ok(ClusterConfig::Standard),
            "dedicated" => {
                let cku = config.get_number(&AttributePath::new("cku")).map_err(|_| {
                    Diagnostic::error(
                        "Missing cku",
                        "Dedicated clusters require the 'cku' attribute",
                    )
                    .with_attribute(AttributePath::new("cku"))
                })?;
                if cku.fract() != 0.0 || cku < 1.0 {
                    return Err(Diagnostic::error(
                        "Invalid cku",
                        format!("'cku' must be a whole number of at least 1, got {}", cku),
                    )
                    .with_attribute(AttributePath::new("cku")));
                }
                Ok(ClusterConfig::Dedicated { cku: cku as u32 })
            }
            other => Err(Diagnostic::error(
                "Invalid cluster type",
                format!("Cluster type must be one of {:?}, got {:?}", VALID_TYPES, other),
            )
            .with_attribute(AttributePath::new("type"))),
        }
    }

    fn state_from_cluster(cluster: &KafkaCluster, base: DynamicValue) -> DynamicValue {
        let mut state = base;
        let _ = state.set_string(&AttributePath::new("id"), cluster.id.clone());
        let _ = state.set_string(
            &AttributePath::new("display_name"),
            cluster.spec.display_name.clone(),
        );
        let _ = state.set_string(&AttributePath::new("cloud"), cluster.spec.cloud.clone());
        let _ = state.set_string(&AttributePath::new("region"), cluster.spec.region.clone());
        let _ = state.set_string(
            &AttributePath::new("type"),
            cluster.spec.config.kind().to_lowercase(),
        );
        if let ClusterConfig::Dedicated { cku } = cluster.spec.config {
            let _ = state.set_number(&AttributePath::new("cku"), cku as f64);
        }
        let _ = state.set_string(
            &AttributePath::new("environment_id"),
            cluster.spec.environment.id.clone(),
        );
        if let Some(endpoint) = &cluster.spec.kafka_bootstrap_endpoint {
            let _ = state.set_string(&AttributePath::new("bootstrap_endpoint"), endpoint.clone());
        }
        if let Some(endpoint) = &cluster.spec.http_endpoint {
            let _ = state.set_string(&AttributePath::new("http_endpoint"), endpoint.clone());
        }
        state
    }
}

#[async_trait]
impl Resource for KafkaClusterResource {
    fn type_name(&self) -> &str {
        "cascade_kafka_cluster"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Kafka cluster within an environment")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The cluster ID (e.g., lkc-abc123)")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Human-readable name of the cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cloud", AttributeType::String)
                    .description("Cloud provider (AWS, GCP, AZURE); immutable")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("Cloud region; immutable")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("availability", AttributeType::String)
                    .description("SINGLE_ZONE or MULTI_ZONE")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Cluster tier: basic, standard, or dedicated; immutable")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cku", AttributeType::Number)
                    .description("Capacity units; required for dedicated clusters")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment_id", AttributeType::String)
                    .description("ID of the containing environment; immutable")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("bootstrap_endpoint", AttributeType::String)
                    .description("Kafka bootstrap endpoint, available once provisioned")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("http_endpoint", AttributeType::String)
                    .description("REST endpoint, available once provisioned")
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if let Ok(cluster_type) = request.config.get_string(&AttributePath::new("type")) {
            if !VALID_TYPES.contains(&cluster_type.as_str()) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid cluster type",
                        format!("Cluster type must be one of: {:?}", VALID_TYPES),
                    )
                    .with_attribute(AttributePath::new("type")),
                );
            }

            let cku = request.config.get_number(&AttributePath::new("cku")).ok();
            let has_cku = cku.is_some();
            if cluster_type == "dedicated" {
                match cku {
                    Some(cku) if cku.fract() != 0.0 || cku < 1.0 => {
                        diagnostics.push(
                            Diagnostic::error(
                                "Invalid cku",
                                format!(
                                    "'cku' must be a whole number of at least 1, got {}",
                                    cku
                                ),
                            )
                            .with_attribute(AttributePath::new("cku")),
                        );
                    }
                    Some(_) => {}
                    None => {
                        diagnostics.push(
                            Diagnostic::error(
                                "Missing cku",
                                "Dedicated clusters require the 'cku' attribute",
                            )
                            .with_attribute(AttributePath::new("cku")),
                        );
                    }
                }
            }
            if cluster_type != "dedicated" && has_cku {
                diagnostics.push(
                    Diagnostic::error(
                        "Unexpected cku",
                        "The 'cku' attribute is only valid for dedicated clusters",
                    )
                    .with_attribute(AttributePath::new("cku")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let environment_id = match request
            .config
            .get_string(&AttributePath::new("environment_id"))
        {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing environment_id",
                    "The 'environment_id' attribute is required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let cluster_config = match Self::cluster_config_from(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let create_request = CreateClusterRequest {
            spec: CreateClusterSpec {
                display_name: request
                    .config
                    .get_string(&AttributePath::new("display_name"))
                    .unwrap_or_default(),
                cloud: request
                    .config
                    .get_string(&AttributePath::new("cloud"))
                    .unwrap_or_default(),
                region: request
                    .config
                    .get_string(&AttributePath::new("region"))
                    .unwrap_or_default(),
                availability: request
                    .config
                    .get_string(&AttributePath::new("availability"))
                    .ok(),
                config: cluster_config,
                environment: EnvironmentRef {
                    id: environment_id.clone(),
                },
            },
        };

        let created = match provider_data.client.create_cluster(&create_request).await {
            Ok(cluster) => cluster,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create cluster",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let conf = StateChangeConf::new([PHASE_PROVISIONING], [PHASE_PROVISIONED])
            .timeout(PROVISION_TIMEOUT)
            .poll_interval(PROVISION_POLL_INTERVAL);

        let client = provider_data.client.clone();
        let cluster_id = created.id.clone();
        let env = environment_id.clone();

        let provisioned = wait_for_state(&ctx, &conf, || {
            let client = client.clone();
            let cluster_id = cluster_id.clone();
            let env = env.clone();
            async move {
                let cluster = client.get_cluster(&cluster_id, &env).await?;
                let phase = cluster.status.phase.clone();
                Ok((cluster, phase))
            }
        })
        .await;

        match provisioned {
            Ok(cluster) => CreateResourceResponse {
                new_state: Self::state_from_cluster(&cluster, request.planned_state),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Cluster did not reach PROVISIONED",
                    format!(
                        "Cluster {} was created but provisioning did not complete: {}",
                        created.id, e
                    ),
                ));
                // Keep the ID so the practitioner can retry or destroy.
                let mut new_state = request.planned_state;
                let _ = new_state.set_string(&AttributePath::new("id"), created.id);
                CreateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let (id, environment_id) = match (
            request.current_state.get_string(&AttributePath::new("id")),
            request
                .current_state
                .get_string(&AttributePath::new("environment_id")),
        ) {
            (Ok(id), Ok(env)) => (id, env),
            _ => {
                return ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                    private: request.private,
                };
            }
        };

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                };
            }
        };

        match provider_data.client.get_cluster(&id, &environment_id).await {
            Ok(cluster) => ReadResourceResponse {
                new_state: Some(Self::state_from_cluster(&cluster, request.current_state)),
                diagnostics,
                private: request.private,
            },
            Err(ApiError::NotFound) => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read cluster",
                    format!("API error: {}", e),
                ));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                    private: request.private,
                }
            }
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        // Reject changes to immutable attributes before touching the API.
        for attr in ["cloud", "region", "type", "environment_id"] {
            let prior = request.prior_state.get_string(&AttributePath::new(attr)).ok();
            let planned = request.config.get_string(&AttributePath::new(attr)).ok();
            if let (Some(prior), Some(planned)) = (prior, planned) {
                if prior != planned {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("Cannot change '{}'", attr),
                            format!(
                                "'{}' is immutable after provisioning ({:?} -> {:?}); replace the cluster instead",
                                attr, prior, planned
                            ),
                        )
                        .with_attribute(AttributePath::new(attr)),
                    );
                }
            }
        }
        if !diagnostics.is_empty() {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics,
            };
        }

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let (id, environment_id) = match (
            request.prior_state.get_string(&AttributePath::new("id")),
            request
                .prior_state
                .get_string(&AttributePath::new("environment_id")),
        ) {
            (Ok(id), Ok(env)) => (id, env),
            _ => {
                diagnostics.push(Diagnostic::error(
                    "Missing cluster identity",
                    "Prior state has no 'id' or 'environment_id' attribute",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let config = match Self::cluster_config_from(&request.config) {
            Ok(config) => config,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let update_request = UpdateClusterRequest {
            spec: UpdateClusterSpec {
                display_name: request
                    .config
                    .get_string(&AttributePath::new("display_name"))
                    .ok(),
                config: match config {
                    // Only dedicated clusters have a mutable capacity knob.
                    ClusterConfig::Dedicated { cku } => Some(ClusterConfig::Dedicated { cku }),
                    _ => None,
                },
                environment: EnvironmentRef {
                    id: environment_id,
                },
            },
        };

        match provider_data.client.update_cluster(&id, &update_request).await {
            Ok(cluster) => UpdateResourceResponse {
                new_state: Self::state_from_cluster(&cluster, request.planned_state),
                private: vec![],
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update cluster",
                    format!("API error: {}", e),
                ));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                }
            }
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        let (id, environment_id) = match (
            request.prior_state.get_string(&AttributePath::new("id")),
            request
                .prior_state
                .get_string(&AttributePath::new("environment_id")),
        ) {
            (Ok(id), Ok(env)) => (id, env),
            _ => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data.client.delete_cluster(&id, &environment_id).await {
            Ok(()) | Err(ApiError::NotFound) => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete cluster",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for KafkaClusterResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
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
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for KafkaClusterResource {
    /// Import ID format: "environmentId/clusterId". The ID is parsed and
    /// validated locally; the host performs the refresh read afterwards.
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let parts = match split_composite_id(&request.id, 2) {
            Ok(parts) => parts,
            Err(e) => {
                response.diagnostics.push(Diagnostic::error(
                    "Invalid import ID",
                    format!(
                        "Expected \"{}\", got {:?}: {}",
                        join_composite_id(&["<environment_id>", "<cluster_id>"]),
                        request.id,
                        e
                    ),
                ));
                return response;
            }
        };

        let mut state = DynamicValue::empty();
        let _ = state.set_string(&AttributePath::new("environment_id"), parts[0].clone());
        let _ = state.set_string(&AttributePath::new("id"), parts[1].clone());

        response.imported_resources.push(ImportedResource {
            type_name: request.type_name,
            state,
            private: vec![],
        });
        response
    }
}
