pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::CascadeProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfcore::context::Context;
use tfcore::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
};
use tfcore::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfcore::types::{AttributePath, Diagnostic, DynamicValue};

use api::{Client, Credentials, IdentityPoolExchange, OAuthCredentials, TokenSource};

pub const ENDPOINT_ENV_VAR: &str = "CASCADE_ENDPOINT";
pub const API_KEY_ENV_VAR: &str = "CASCADE_API_KEY";
pub const API_SECRET_ENV_VAR: &str = "CASCADE_API_SECRET";

const DEFAULT_ENDPOINT: &str = "https://api.cascade.dev";
const DEFAULT_STS_ENDPOINT: &str = "https://api.cascade.dev/sts/v1/oauth2/token";

pub struct CascadeProvider {
    provider_data: Option<CascadeProviderData>,
}

impl Default for CascadeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CascadeProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    fn config_or_env(config: &DynamicValue, attr: &str, env_var: &str) -> Option<String> {
        config
            .get_string(&AttributePath::new(attr))
            .ok()
            .or_else(|| std::env::var(env_var).ok())
    }

    fn build_credentials(
        config: &DynamicValue,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Credentials> {
        let api_key = Self::config_or_env(config, "api_key", API_KEY_ENV_VAR);
        let api_secret = Self::config_or_env(config, "api_secret", API_SECRET_ENV_VAR);

        let oauth_token_url = config
            .get_string(&AttributePath::new("oauth_token_url"))
            .ok();
        let oauth_client_id = config
            .get_string(&AttributePath::new("oauth_client_id"))
            .ok();
        let oauth_client_secret = config
            .get_string(&AttributePath::new("oauth_client_secret"))
            .ok();

        let has_basic = api_key.is_some() || api_secret.is_some();
        let has_oauth = oauth_token_url.is_some()
            || oauth_client_id.is_some()
            || oauth_client_secret.is_some();

        if has_basic && has_oauth {
            diagnostics.push(Diagnostic::error(
                "Conflicting credentials",
                "Configure either api_key/api_secret or the oauth_* attributes, not both",
            ));
            return None;
        }

        if has_basic {
            return match (api_key, api_secret) {
                (Some(api_key), Some(api_secret)) => Some(Credentials::Basic {
                    api_key,
                    api_secret,
                }),
                _ => {
                    diagnostics.push(Diagnostic::error(
                        "Incomplete credentials",
                        format!(
                            "Both api_key and api_secret are required (or {} and {} env vars)",
                            API_KEY_ENV_VAR, API_SECRET_ENV_VAR
                        ),
                    ));
                    None
                }
            };
        }

        if has_oauth {
            let (token_url, client_id, client_secret) =
                match (oauth_token_url, oauth_client_id, oauth_client_secret) {
                    (Some(u), Some(i), Some(s)) => (u, i, s),
                    _ => {
                        diagnostics.push(Diagnostic::error(
                            "Incomplete credentials",
                            "oauth_token_url, oauth_client_id, and oauth_client_secret are all required",
                        ));
                        return None;
                    }
                };

            let identity_pool_id = config
                .get_string(&AttributePath::new("identity_pool_id"))
                .ok();
            let sts_endpoint = config.get_string(&AttributePath::new("sts_endpoint")).ok();

            let exchange = match (identity_pool_id, sts_endpoint) {
                (Some(identity_pool_id), sts_endpoint) => Some(IdentityPoolExchange {
                    sts_url: sts_endpoint
                        .unwrap_or_else(|| DEFAULT_STS_ENDPOINT.to_string()),
                    identity_pool_id,
                }),
                (None, Some(_)) => {
                    diagnostics.push(Diagnostic::error(
                        "Unexpected sts_endpoint",
                        "sts_endpoint has no effect without identity_pool_id",
                    ));
                    return None;
                }
                (None, None) => None,
            };

            let source = TokenSource::new(
                reqwest::Client::new(),
                OAuthCredentials {
                    token_url,
                    client_id,
                    client_secret,
                    scope: config.get_string(&AttributePath::new("oauth_scope")).ok(),
                },
                exchange,
            );
            return Some(Credentials::OAuth(Arc::new(source)));
        }

        diagnostics.push(Diagnostic::error(
            "Missing credentials",
            format!(
                "Set api_key/api_secret (or {}/{} env vars) or the oauth_* attributes",
                API_KEY_ENV_VAR, API_SECRET_ENV_VAR
            ),
        ));
        None
    }
}

#[async_trait]
impl Provider for CascadeProvider {
    fn type_name(&self) -> &str {
        "cascade"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages streaming infrastructure on the Cascade platform")
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Control-plane API endpoint; defaults to the public endpoint")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("Cloud API key for basic authentication")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_secret", AttributeType::String)
                    .description("Cloud API secret for basic authentication")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("oauth_token_url", AttributeType::String)
                    .description("OAuth token endpoint for client-credentials authentication")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("oauth_client_id", AttributeType::String)
                    .description("OAuth client ID")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("oauth_client_secret", AttributeType::String)
                    .description("OAuth client secret")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("oauth_scope", AttributeType::String)
                    .description("Optional OAuth scope")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("identity_pool_id", AttributeType::String)
                    .description("Identity pool to exchange the OAuth token against")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sts_endpoint", AttributeType::String)
                    .description("STS endpoint used for the identity pool exchange; defaults to the public endpoint")
                    .optional()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let mut diagnostics = vec![];

        let endpoint = Self::config_or_env(&request.config, "endpoint", ENDPOINT_ENV_VAR)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let credentials = match Self::build_credentials(&request.config, &mut diagnostics) {
            Some(credentials) => credentials,
            None => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                };
            }
        };

        match Client::new(&endpoint, credentials) {
            Ok(client) => {
                let data = CascadeProviderData::new(client);
                self.provider_data = Some(data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(data)),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to create API client",
                    format!("API error: {}", e),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "cascade_environment".to_string(),
            Box::new(|| Box::new(resources::environment::EnvironmentResource::new())),
        );
        factories.insert(
            "cascade_kafka_cluster".to_string(),
            Box::new(|| Box::new(resources::kafka_cluster::KafkaClusterResource::new())),
        );
        factories.insert(
            "cascade_api_key".to_string(),
            Box::new(|| Box::new(resources::api_key::ApiKeyResource::new())),
        );
        factories.insert(
            "cascade_connector".to_string(),
            Box::new(|| Box::new(resources::connector::ConnectorResource::new())),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "cascade_environment".to_string(),
            Box::new(|| Box::new(data_sources::environment::EnvironmentDataSource::new())),
        );
        factories.insert(
            "cascade_kafka_cluster".to_string(),
            Box::new(|| Box::new(data_sources::kafka_cluster::KafkaClusterDataSource::new())),
        );
        factories
    }
}
