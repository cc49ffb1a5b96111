//! API key resource implementation
//!
//! The secret is only ever returned by the create call, so it is written
//! into state there and carried forward on every subsequent read. Newly
//! created keys take a short while to propagate through the auth layer;
//! create polls until the key is readable twice in a row before returning.

use async_trait::async_trait;
use std::time::Duration;
use tfcore::context::Context;
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

use crate::api::api_keys::{
    ApiKey, CreateApiKeyRequest, CreateApiKeySpec, OwnerRef, ResourceRef, UpdateApiKeyRequest,
    UpdateApiKeySpec,
};
use crate::api::wait::{wait_for_state, StateChangeConf};
use crate::api::ApiError;

/// Environment variable consulted during import for the secret, which the
/// API will never return again.
pub const IMPORT_SECRET_ENV_VAR: &str = "IMPORT_CASCADE_API_KEY_SECRET";

const PROPAGATION_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const PROPAGATION_POLL_INTERVAL: Duration = Duration::from_secs(2);

const STATE_PROPAGATING: &str = "PROPAGATING";
const STATE_ONLINE: &str = "ONLINE";

#[derive(Default)]
pub struct ApiKeyResource {
    provider_data: Option<crate::CascadeProviderData>,
}

impl ApiKeyResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_key(state: &mut DynamicValue, key: &ApiKey) {
        let _ = state.set_string(&AttributePath::new("id"), key.id.clone());
        let _ = state.set_string(
            &AttributePath::new("display_name"),
            key.spec.display_name.clone(),
        );
        if let Some(description) = &key.spec.description {
            let _ = state.set_string(&AttributePath::new("description"), description.clone());
        }
        let _ = state.set_string(&AttributePath::new("owner_id"), key.spec.owner.id.clone());
        if let Some(resource) = &key.spec.resource {
            let _ = state.set_string(&AttributePath::new("resource_id"), resource.id.clone());
            if let Some(env) = &resource.environment {
                let _ = state.set_string(&AttributePath::new("environment_id"), env.clone());
            }
        }
    }
}

#[async_trait]
impl Resource for ApiKeyResource {
    fn type_name(&self) -> &str {
        "cascade_api_key"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages an API key for a service account or user")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The API key ID")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Human-readable name of the key")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Free-form description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("owner_id", AttributeType::String)
                    .description("Service account or user the key belongs to")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resource_id", AttributeType::String)
                    .description("Cluster the key is scoped to; omit for a cloud-level key")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment_id", AttributeType::String)
                    .description("Environment of the scoped cluster")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .description("The key secret; only available at creation time")
                    .computed()
                    .sensitive()
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

        let has_resource = request
            .config
            .get_string(&AttributePath::new("resource_id"))
            .is_ok();
        let has_environment = request
            .config
            .get_string(&AttributePath::new("environment_id"))
            .is_ok();

        if has_resource && !has_environment {
            diagnostics.push(
                Diagnostic::error(
                    "Missing environment_id",
                    "Cluster-scoped keys require 'environment_id' alongside 'resource_id'",
                )
                .with_attribute(AttributePath::new("environment_id")),
            );
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

        let display_name = match request
            .config
            .get_string(&AttributePath::new("display_name"))
        {
            Ok(name) => name,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing display_name",
                    "The 'display_name' attribute is required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let owner_id = match request.config.get_string(&AttributePath::new("owner_id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing owner_id",
                    "The 'owner_id' attribute is required",
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let resource = request
            .config
            .get_string(&AttributePath::new("resource_id"))
            .ok()
            .map(|id| ResourceRef {
                id,
                environment: request
                    .config
                    .get_string(&AttributePath::new("environment_id"))
                    .ok(),
            });

        let create_request = CreateApiKeyRequest {
            spec: CreateApiKeySpec {
                display_name,
                description: request
                    .config
                    .get_string(&AttributePath::new("description"))
                    .ok(),
                owner: OwnerRef { id: owner_id },
                resource,
            },
        };

        let created = match provider_data.client.create_api_key(&create_request).await {
            Ok(key) => key,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create API key",
                    format!("API error: {}", e),
                ));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        // The key is not usable everywhere the instant create returns.
        // Require two consecutive successful reads before declaring it
        // ready; a single read can hit an already-consistent replica.
        let conf = StateChangeConf::new([STATE_PROPAGATING], [STATE_ONLINE])
            .timeout(PROPAGATION_TIMEOUT)
            .poll_interval(PROPAGATION_POLL_INTERVAL)
            .continuous_target_occurrences(2);

        let client = provider_data.client.clone();
        let key_id = created.id.clone();

        let wait_result = wait_for_state(&ctx, &conf, || {
            let client = client.clone();
            let key_id = key_id.clone();
            async move {
                match client.get_api_key(&key_id).await {
                    Ok(key) => Ok((Some(key), STATE_ONLINE.to_string())),
                    Err(ApiError::NotFound) => Ok((None, STATE_PROPAGATING.to_string())),
                    Err(e) => Err(e),
                }
            }
        })
        .await;

        if let Err(e) = wait_result {
            diagnostics.push(Diagnostic::warning(
                "API key propagation not confirmed",
                format!(
                    "Key {} was created but readability was not confirmed: {}",
                    created.id, e
                ),
            ));
        }

        let mut new_state = request.planned_state;
        Self::apply_key(&mut new_state, &created);
        if let Some(secret) = &created.spec.secret {
            let _ = new_state.set_string(&AttributePath::new("secret"), secret.clone());
        } else {
            diagnostics.push(Diagnostic::error(
                "Missing secret in create response",
                "The API did not return a secret; the key state will be incomplete",
            ));
        }

        CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics,
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let id = match request.current_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
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

        match provider_data.client.get_api_key(&id).await {
            Ok(key) => {
                // The read response never includes the secret; keep the one
                // already in state.
                let mut new_state = request.current_state.clone();
                Self::apply_key(&mut new_state, &key);
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
                    "Failed to read API key",
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

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing API key ID",
                    "Prior state has no 'id' attribute",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let display_name = match request
            .config
            .get_string(&AttributePath::new("display_name"))
        {
            Ok(name) => name,
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "Missing display_name",
                    "The 'display_name' attribute is required",
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics,
                };
            }
        };

        let update_request = UpdateApiKeyRequest {
            spec: UpdateApiKeySpec {
                display_name,
                description: request
                    .config
                    .get_string(&AttributePath::new("description"))
                    .ok(),
            },
        };

        match provider_data.client.update_api_key(&id, &update_request).await {
            Ok(key) => {
                let mut new_state = request.planned_state;
                Self::apply_key(&mut new_state, &key);
                // Carry the secret across the update.
                if let Ok(secret) = request
                    .prior_state
                    .get_string(&AttributePath::new("secret"))
                {
                    let _ = new_state.set_string(&AttributePath::new("secret"), secret);
                }
                UpdateResourceResponse {
                    new_state,
                    private: vec![],
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to update API key",
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

        let id = match request.prior_state.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(_) => {
                return DeleteResourceResponse { diagnostics };
            }
        };

        match provider_data.client.delete_api_key(&id).await {
            Ok(()) | Err(ApiError::NotFound) => DeleteResourceResponse { diagnostics },
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to delete API key",
                    format!("API error: {}", e),
                ));
                DeleteResourceResponse { diagnostics }
            }
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ApiKeyResource {
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
impl ResourceWithImportState for ApiKeyResource {
    /// The import ID is the key ID alone; the secret cannot be fetched, so
    /// it is taken from IMPORT_CASCADE_API_KEY_SECRET when set.
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        let mut state = DynamicValue::empty();
        let _ = state.set_string(&AttributePath::new("id"), request.id.clone());

        match std::env::var(IMPORT_SECRET_ENV_VAR) {
            Ok(secret) if !secret.is_empty() => {
                let _ = state.set_string(&AttributePath::new("secret"), secret);
            }
            _ => {
                response.diagnostics.push(Diagnostic::warning(
                    "API key secret not available",
                    format!(
                        "Set {} to include the secret in imported state; it cannot be read from the API",
                        IMPORT_SECRET_ENV_VAR
                    ),
                ));
            }
        }

        response.imported_resources.push(ImportedResource {
            type_name: request.type_name,
            state,
            private: vec![],
        });
        response
    }
}
