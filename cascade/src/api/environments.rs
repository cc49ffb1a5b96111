//! Environment API implementation
//!
//! Environments are the top-level grouping for clusters and service
//! accounts; most other resource paths take an environment ID.

use serde::{Deserialize, Serialize};

use super::common::ApiListResponse;
use super::error::ApiError;
use super::Client;

const ENVIRONMENTS_PATH: &str = "/org/v2/environments";

#[derive(Debug, Clone, Deserialize)]
pub struct Environment {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub stream_governance: Option<StreamGovernanceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamGovernanceConfig {
    pub package: String,
}

#[derive(Debug, Serialize)]
pub struct CreateEnvironmentRequest {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_governance: Option<StreamGovernanceConfig>,
}

#[derive(Debug, Serialize)]
pub struct UpdateEnvironmentRequest {
    pub display_name: String,
}

impl Client {
    /// GET /org/v2/environments
    pub async fn list_environments(&self) -> Result<Vec<Environment>, ApiError> {
        let response: ApiListResponse<Environment> = self.get(ENVIRONMENTS_PATH).await?;
        Ok(response.data)
    }

    /// GET /org/v2/environments/{id}
    pub async fn get_environment(&self, id: &str) -> Result<Environment, ApiError> {
        self.get(&format!("{}/{}", ENVIRONMENTS_PATH, id)).await
    }

    /// POST /org/v2/environments
    pub async fn create_environment(
        &self,
        request: &CreateEnvironmentRequest,
    ) -> Result<Environment, ApiError> {
        self.post(ENVIRONMENTS_PATH, request).await
    }

    /// PATCH /org/v2/environments/{id}
    pub async fn update_environment(
        &self,
        id: &str,
        request: &UpdateEnvironmentRequest,
    ) -> Result<Environment, ApiError> {
        self.patch(&format!("{}/{}", ENVIRONMENTS_PATH, id), request)
            .await
    }

    /// DELETE /org/v2/environments/{id}
    pub async fn delete_environment(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", ENVIRONMENTS_PATH, id)).await
    }
}
