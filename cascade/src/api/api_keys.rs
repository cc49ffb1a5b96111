//! API key API implementation
//!
//! The secret is returned exactly once, in the create response. Reads and
//! lists never include it; callers keep the secret from whatever state
//! they already hold.

use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::Client;

const API_KEYS_PATH: &str = "/iam/v2/api-keys";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub spec: ApiKeySpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySpec {
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Present only in the create response.
    #[serde(default)]
    pub secret: Option<String>,
    pub owner: OwnerRef,
    #[serde(default)]
    pub resource: Option<ResourceRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRef {
    pub id: String,
}

/// The cluster (or other resource) the key is scoped to. Cloud-level keys
/// have no resource ref.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub environment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeyRequest {
    pub spec: CreateApiKeySpec,
}

#[derive(Debug, Serialize)]
pub struct CreateApiKeySpec {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: OwnerRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
}

#[derive(Debug, Serialize)]
pub struct UpdateApiKeyRequest {
    pub spec: UpdateApiKeySpec,
}

#[derive(Debug, Serialize)]
pub struct UpdateApiKeySpec {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Client {
    /// GET /iam/v2/api-keys/{id}
    pub async fn get_api_key(&self, id: &str) -> Result<ApiKey, ApiError> {
        self.get(&format!("{}/{}", API_KEYS_PATH, id)).await
    }

    /// POST /iam/v2/api-keys
    pub async fn create_api_key(&self, request: &CreateApiKeyRequest) -> Result<ApiKey, ApiError> {
        self.post(API_KEYS_PATH, request).await
    }

    /// PATCH /iam/v2/api-keys/{id}
    pub async fn update_api_key(
        &self,
        id: &str,
        request: &UpdateApiKeyRequest,
    ) -> Result<ApiKey, ApiError> {
        self.patch(&format!("{}/{}", API_KEYS_PATH, id), request)
            .await
    }

    /// DELETE /iam/v2/api-keys/{id}
    pub async fn delete_api_key(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("{}/{}", API_KEYS_PATH, id)).await
    }
}
