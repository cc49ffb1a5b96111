//! Managed connector resource implementation
//!
//! Connectors are identified by environment, cluster, and name. Create
//! blocks until the connector reports RUNNING; a FAILED report aborts the
//! wait immediately with the connector trace. Deletion is asynchronous on
//! the server side, so delete polls until reads return NotFound.

use async_trait::async_trait;
use std::collections::HashMap;
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
use tfcore::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::connectors::{
    CreateConnectorRequest, CONNECTOR_STATE_PENDING, CONNECTOR_STATE_PROVISIONING,
    CONNECTOR_STATE_RUNNING,
};
use crate::api::wait::{wait_for_state, StateChangeConf};
use crate::api::ApiError;

const PROVISION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
const PROVISION_POLL_INTERVAL: Duration = Duration::from_secs(15);

const DELETE_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DELETE_POLL_INTERVAL: Duration = Duration::from_secs(5);

const STATE_DELETING: &str = "DELETING";
const STATE_DELETED: &str = "DELETED";

#[derive(Default)]
pub struct ConnectorResource {
    provider_data: Option<crate::CascadeProviderData>,
}

impl ConnectorResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn identity_from(state: &DynamicValue) -> Option<(String, String, String)> {
        let env = state
            .get_string(&AttributePath::new("environment_id"))
            .ok()?;
        let cluster = state.get_string(&AttributePath::new("cluster_id")).ok()?;
        let name = state.get_string(&AttributePath::new("name")).ok()?;
        Some((env, cluster, name))
    }

    fn config_map_from(config: &DynamicValue) -> Result<HashMap<String, String>, Diagnostic> {
        let raw = config.get_map(&AttributePath::new("config")).map_err(|_| {
            Diagnostic::error("Missing config", "The 'config' attribute is required")
                .with_attribute(AttributePath::new("config"))
        })?;

        let mut map = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            match value {
                Dynamic::String(s) => {
                    map.insert(key, s);
                }
                other => {
                    return Err(Diagnostic::error(
                        "Invalid config value",
                        format!(
                            "Connector config values must be strings; '{}' is {:?}",
                            key, other
                        ),
                    )
                    .with_attribute(AttributePath::new("config").attribute(&key)));
                }
            }
        }
        Ok(map)
    }

    fn apply_config(state: &mut DynamicValue, config: &HashMap<String, String>) {
        let map = config
            .iter()
            .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
            .collect();
        let _ = state.set_map(&AttributePath::new("config"), map);
    }
}

#[async_trait]
impl Resource for ConnectorResource {
    fn type_name(&self) -> &str {
        "cascade_connector"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a fully managed connector on a Kafka cluster")
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Connector name, unique within the cluster")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment_id", AttributeType::String)
                    .description("Environment of the cluster the connector runs on")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("cluster_id", AttributeType::String)
                    .description("Cluster the connector runs on")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("config", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Connector configuration; values may include credentials")
                    .required()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Last observed connector state")
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

        // config may be absent or unknown during early plans; only validate
        // what is actually present.
        match Self::config_map_from(&request.config) {
            Ok(config) => {
                if !config.contains_key("connector.class") {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing connector.class",
                            "Connector config must include the 'connector.class' entry",
                        )
                        .with_attribute(AttributePath::new("config")),
                    );
                }
            }
            Err(diag) => {
                if request.config.get_map(&AttributePath::new("config")).is_ok() {
                    diagnostics.push(diag);
                }
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

        let (environment_id, cluster_id, name) = match Self::identity_from(&request.config) {
            Some(identity) => identity,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Missing connector identity",
                    "'name', 'environment_id', and 'cluster_id' are all required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let config = match Self::config_map_from(&request.config) {
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

        let create_request = CreateConnectorRequest {
            name: name.clone(),
            config,
        };

        if let Err(e) = provider_data
            .client
            .create_connector(&environment_id, &cluster_id, &create_request)
            .await
        {
            diagnostics.push(Diagnostic::error(
                "Failed to create connector",
                format!("API error: {}", e),
            ));
            return CreateResourceResponse {
                new_state: request.planned_state,
                private: vec![],
                diagnostics,
            };
        }

        // FAILED is in neither set, so a failed connector aborts the wait
        // with the server-side trace instead of burning the full timeout.
        let conf = StateChangeConf::new(
            [CONNECTOR_STATE_PROVISIONING, CONNECTOR_STATE_PENDING],
            [CONNECTOR_STATE_RUNNING],
        )
        .timeout(PROVISION_TIMEOUT)
        .poll_interval(PROVISION_POLL_INTERVAL);

        let client = provider_data.client.clone();
        let env = environment_id.clone();
        let cluster = cluster_id.clone();
        let connector_name = name.clone();

        let running = wait_for_state(&ctx, &conf, || {
            let client = client.clone();
            let env = env.clone();
            let cluster = cluster.clone();
            let connector_name = connector_name.clone();
            async move {
                let status = client
                    .get_connector_status(&env, &cluster, &connector_name)
                    .await?;
                let state = status.connector.state.clone();
                Ok((status, state))
            }
        })
        .await;

        match running {
            Ok(status) => {
                let mut new_state = request.planned_state;
                let _ = new_state.set_string(&AttributePath::new("name"), name);
                let _ = new_state
                    .set_string(&AttributePath::new("environment_id"), environment_id);
                let _ = new_state.set_string(&AttributePath::new("cluster_id"), cluster_id);
                let _ =
                    new_state.set_string(&AttributePath::new("status"), status.connector.state);
                CreateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Connector did not reach RUNNING",
                    format!(
                        "Connector {} was created but did not become healthy: {}",
                        name, e
                    ),
                ));
                let mut new_state = request.planned_state;
                let _ = new_state.set_string(&AttributePath::new("name"), name);
                let _ = new_state
                    .set_string(&AttributePath::new("environment_id"), environment_id);
                let _ = new_state.set_string(&AttributePath::new("cluster_id"), cluster_id);
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

        let (environment_id, cluster_id, name) = match Self::identity_from(&request.current_state)
        {
            Some(identity) => identity,
            None => {
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

        match provider_data
            .client
            .get_connector(&environment_id, &cluster_id, &name)
            .await
        {
            Ok(connector) => {
                let mut new_state = request.current_state.clone();
                Self::apply_config(&mut new_state, &connector.config);

                if let Ok(status) = provider_data
                    .client
                    .get_connector_status(&environment_id, &cluster_id, &name)
                    .await
                {
                    let _ = new_state
                        .set_string(&AttributePath::new("status"), status.connector.state);
                }

                ReadResourceResponse {
                    new_state: Some(new_state),
                    diagnostics,
                    private: request.private,
                }
            }
            Err(ApiError::NotFound) => ReadResourceResponse {
                new_state: None,
                diagnostics,
                private: request.private,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to read connector",
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

        let (environment_id, cluster_id, name) = match Self::identity_from(&request.prior_state) {
            Some(identity) => identity,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Missing connector identity",
                    "Prior state lacks 'name', 'environment_id', or 'cluster_id'",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let config = match Self::config_map_from(&request.config) {
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

        match provider_data
            .client
            .update_connector_config(&environment_id, &cluster_id, &name, &config)
            .await
        {
            Ok(connector) => {
                let mut new_state = request.planned_state;
                Self::apply_config(&mut new_state, &connector.config);
                UpdateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update connector",
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

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let provider_data = match &self.provider_data {
            Some(data) => data,
            None => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        let (environment_id, cluster_id, name) = match Self::identity_from(&request.prior_state) {
            Some(identity) => identity,
            None => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data
            .client
            .delete_connector(&environment_id, &cluster_id, &name)
            .await
        {
            Ok(()) | Err(ApiError::NotFound) => {}
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete connector",
                    format!("API error: {}", e),
                ));
                return DeleteResourceResponse { diagnostics };
            }
        }

        // Teardown is asynchronous; the connector answers reads until it is
        // gone. Poll until NotFound so a follow-up create of the same name
        // does not collide.
        let conf = StateChangeConf::new([STATE_DELETING], [STATE_DELETED])
            .timeout(DELETE_TIMEOUT)
            .poll_interval(DELETE_POLL_INTERVAL);

        let client = provider_data.client.clone();
        let env = environment_id.clone();
        let cluster = cluster_id.clone();
        let connector_name = name.clone();

        let wait_result = wait_for_state(&ctx, &conf, || {
            let client = client.clone();
            let env = env.clone();
            let cluster = cluster.clone();
            let connector_name = connector_name.clone();
            async move {
                match client
                    .get_connector(&env, &cluster, &connector_name)
                    .await
                {
                    Ok(_) => Ok(((), STATE_DELETING.to_string())),
                    Err(ApiError::NotFound) => Ok(((), STATE_DELETED.to_string())),
                    Err(e) => Err(e),
                }
            }
        })
        .await;

        if let Err(e) = wait_result {
            diagnostics.push(Diagnostic::warning(
                "Connector deletion not confirmed",
                format!(
                    "Delete was accepted but connector {} was still readable: {}",
                    name, e
                ),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for ConnectorResource {
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
impl ResourceWithImportState for ConnectorResource {
    /// Import ID format: "environmentId/clusterId/connectorName". Parsed
    /// locally; the host refreshes afterwards.
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let parts = match split_composite_id(&request.id, 3) {
            Ok(parts) => parts,
            Err(e) => {
                response.diagnostics.push(Diagnostic::error(
                    "Invalid import ID",
                    format!(
                        "Expected \"{}\", got {:?}: {}",
                        join_composite_id(&["<environment_id>", "<cluster_id>", "<name>"]),
                        request.id,
                        e
                    ),
                ));
                return response;
            }
        };

        let mut state = DynamicValue::empty();
        let _ = state.set_string(&AttributePath::new("environment_id"), parts[0].clone());
        let _ = state.set_string(&AttributePath::new("cluster_id"), parts[1].clone());
        let _ = state.set_string(&AttributePath::new("name"), parts[2].clone());

        response.imported_resources.push(ImportedResource {
            type_name: request.type_name,
            state,
            private: vec![],
        });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector_config(entries: &[(&str, &str)]) -> DynamicValue {
        let mut config = DynamicValue::empty();
        let map = entries
            .iter()
            .map(|(k, v)| (k.to_string(), Dynamic::String(v.to_string())))
            .collect();
        let _ = config.set_map(&AttributePath::new("config"), map);
        config
    }

    #[tokio::test]
    async fn validate_requires_connector_class() {
        let resource = ConnectorResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "cascade_connector".to_string(),
                    config: connector_config(&[("topics", "orders")]),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .summary
            .contains("Missing connector.class"));
    }

    #[tokio::test]
    async fn validate_accepts_complete_config() {
        let resource = ConnectorResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "cascade_connector".to_string(),
                    config: connector_config(&[
                        ("connector.class", "S3_SINK"),
                        ("topics", "orders"),
                    ]),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn import_splits_three_segment_id() {
        let resource = ConnectorResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "cascade_connector".to_string(),
                    id: "env-1/lkc-2/s3-sink".to_string(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("cluster_id")).unwrap(),
            "lkc-2"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "s3-sink"
        );
    }

    #[tokio::test]
    async fn import_rejects_wrong_segment_count() {
        let resource = ConnectorResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "cascade_connector".to_string(),
                    id: "env-1/lkc-2".to_string(),
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
    }
}
