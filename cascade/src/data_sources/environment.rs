//! Environment data source implementation
//!
//! Looks up an environment by ID, or by display_name when the ID is not
//! known. A display_name lookup lists all environments and requires an
//! exact, unique match.

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

use crate::api::environments::Environment;

#[derive(Default)]
pub struct EnvironmentDataSource {
    provider_data: Option<crate::CascadeProviderData>,
}

impl EnvironmentDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for EnvironmentDataSource {
    fn type_name(&self) -> &str {
        "cascade_environment"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up an environment by ID or display name")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The environment ID; either this or display_name must be set")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_name", AttributeType::String)
                    .description("Exact display name to search for")
                    .optional()
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

        let has_id = request.config.get_string(&AttributePath::new("id")).is_ok();
        let has_name = request
            .config
            .get_string(&AttributePath::new("display_name"))
            .is_ok();

        if !has_id && !has_name {
            diagnostics.push(Diagnostic::error(
                "Missing lookup key",
                "Either 'id' or 'display_name' must be set",
            ));
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

        let environment: Option<Environment> =
            if let Ok(id) = request.config.get_string(&AttributePath::new("id")) {
                match provider_data.client.get_environment(&id).await {
                    Ok(env) => Some(env),
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Failed to read environment",
                            format!("API error: {}", e),
                        ));
                        None
                    }
                }
            } else {
                let display_name = match request
                    .config
                    .get_string(&AttributePath::new("display_name"))
                {
                    Ok(name) => name,
                    Err(_) => {
                        diagnostics.push(Diagnostic::error(
                            "Missing lookup key",
                            "Either 'id' or 'display_name' must be set",
                        ));
                        return ReadDataSourceResponse { state, diagnostics };
                    }
                };

                match provider_data.client.list_environments().await {
                    Ok(environments) => {
                        let mut matches: Vec<Environment> = environments
                            .into_iter()
                            .filter(|e| e.display_name == display_name)
                            .collect();
                        match matches.len() {
                            1 => Some(matches.remove(0)),
                            0 => {
                                diagnostics.push(Diagnostic::error(
                                    "Environment not found",
                                    format!("No environment named {:?}", display_name),
                                ));
                                None
                            }
                            n => {
                                diagnostics.push(Diagnostic::error(
                                    "Ambiguous display_name",
                                    format!(
                                        "{} environments named {:?}; look up by ID instead",
                                        n, display_name
                                    ),
                                ));
                                None
                            }
                        }
                    }
                    Err(e) => {
                        diagnostics.push(Diagnostic::error(
                            "Failed to list environments",
                            format!("API error: {}", e),
                        ));
                        None
                    }
                }
            };

        if let Some(environment) = environment {
            let _ = state.set_string(&AttributePath::new("id"), environment.id);
            let _ = state.set_string(
                &AttributePath::new("display_name"),
                environment.display_name,
            );
        }

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EnvironmentDataSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use tfcore::types::DynamicValue;

    #[tokio::test]
    async fn validate_requires_id_or_display_name() {
        let ds = EnvironmentDataSource::new();
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "cascade_environment".to_string(),
                    config: DynamicValue::empty(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("Missing lookup key"));
    }

    #[tokio::test]
    async fn validate_accepts_id_alone() {
        let mut config = DynamicValue::empty();
        let _ = config.set_string(&AttributePath::new("id"), "env-1".to_string());

        let ds = EnvironmentDataSource::new();
        let response = ds
            .validate(
                Context::new(),
                ValidateDataSourceConfigRequest {
                    type_name: "cascade_environment".to_string(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }
}
