//! Kafka cluster API implementation
//!
//! Clusters live under an environment; every per-cluster path takes the
//! environment ID as a query parameter. Provisioning is asynchronous:
//! `status.phase` walks PROVISIONING -> PROVISIONED (or FAILED).

use serde::{Deserialize, Serialize};

use super::common::{ApiListResponse, ApiQueryParams};
use super::error::ApiError;
use super::Client;

const CLUSTERS_PATH: &str = "/cmk/v2/clusters";

pub const PHASE_PROVISIONING: &str = "PROVISIONING";
pub const PHASE_PROVISIONED: &str = "PROVISIONED";
pub const PHASE_FAILED: &str = "FAILED";

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaCluster {
    pub id: String,
    pub spec: ClusterSpec,
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSpec {
    pub display_name: String,
    pub cloud: String,
    pub region: String,
    #[serde(default)]
    pub availability: Option<String>,
    pub config: ClusterConfig,
    pub environment: EnvironmentRef,
    #[serde(default)]
    pub kafka_bootstrap_endpoint: Option<String>,
    #[serde(default)]
    pub http_endpoint: Option<String>,
}

/// Cluster tier. Exactly one variant applies; `kind` discriminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ClusterConfig {
    Basic,
    Standard,
    Dedicated { cku: u32 },
}

impl ClusterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterConfig::Basic => "Basic",
            ClusterConfig::Standard => "Standard",
            ClusterConfig::Dedicated { .. } => "Dedicated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterStatus {
    pub phase: String,
    #[serde(default)]
    pub cku: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateClusterRequest {
    pub spec: CreateClusterSpec,
}

#[derive(Debug, Serialize)]
pub struct CreateClusterSpec {
    pub display_name: String,
    pub cloud: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    pub config: ClusterConfig,
    pub environment: EnvironmentRef,
}

/// Only display_name and cku are mutable after provisioning; the caller
/// validates immutability before building this request.
#[derive(Debug, Serialize)]
pub struct UpdateClusterRequest {
    pub spec: UpdateClusterSpec,
}

#[derive(Debug, Serialize)]
pub struct UpdateClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ClusterConfig>,
    pub environment: EnvironmentRef,
}

impl Client {
    /// GET /cmk/v2/clusters?environment={env}
    pub async fn list_clusters(&self, environment_id: &str) -> Result<Vec<KafkaCluster>, ApiError> {
        let params = ApiQueryParams::new().add("environment", environment_id);
        let response: ApiListResponse<KafkaCluster> =
            self.get_with_params(CLUSTERS_PATH, &params).await?;
        Ok(response.data)
    }

    /// GET /cmk/v2/clusters/{id}?environment={env}
    pub async fn get_cluster(
        &self,
        id: &str,
        environment_id: &str,
    ) -> Result<KafkaCluster, ApiError> {
        let params = ApiQueryParams::new().add("environment", environment_id);
        self.get_with_params(&format!("{}/{}", CLUSTERS_PATH, id), &params)
            .await
    }

    /// POST /cmk/v2/clusters
    pub async fn create_cluster(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<KafkaCluster, ApiError> {
        self.post(CLUSTERS_PATH, request).await
    }

    /// PATCH /cmk/v2/clusters/{id}
    pub async fn update_cluster(
        &self,
        id: &str,
        request: &UpdateClusterRequest,
    ) -> Result<KafkaCluster, ApiError> {
        self.patch(&format!("{}/{}", CLUSTERS_PATH, id), request)
            .await
    }

    /// DELETE /cmk/v2/clusters/{id}?environment={env}
    pub async fn delete_cluster(&self, id: &str, environment_id: &str) -> Result<(), ApiError> {
        let params = ApiQueryParams::new().add("environment", environment_id);
        self.delete_with_params(&format!("{}/{}", CLUSTERS_PATH, id), &params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_config_serializes_with_kind_tag() {
        let basic = serde_json::to_value(&ClusterConfig::Basic).unwrap();
        assert_eq!(basic, serde_json::json!({"kind": "Basic"}));

        let dedicated = serde_json::to_value(&ClusterConfig::Dedicated { cku: 2 }).unwrap();
        assert_eq!(dedicated, serde_json::json!({"kind": "Dedicated", "cku": 2}));
    }

    #[test]
    fn cluster_deserializes_from_api_shape() {
        let body = serde_json::json!({
            "id": "lkc-abc123",
            "spec": {
                "display_name": "orders",
                "cloud": "AWS",
                "region": "us-east-2",
                "availability": "SINGLE_ZONE",
                "config": {"kind": "Dedicated", "cku": 2},
                "environment": {"id": "env-1"},
                "kafka_bootstrap_endpoint": "SASL_SSL://lkc-abc123.us-east-2.aws.cascade.dev:9092"
            },
            "status": {"phase": "PROVISIONED", "cku": 2}
        });

        let cluster: KafkaCluster = serde_json::from_value(body).unwrap();
        assert_eq!(cluster.id, "lkc-abc123");
        assert_eq!(cluster.spec.config.kind(), "Dedicated");
        assert_eq!(cluster.status.phase, PHASE_PROVISIONED);
        assert_eq!(cluster.status.cku, Some(2));
    }

    #[test]
    fn failed_provisioning_status_deserializes() {
        let body = serde_json::json!({
            "id": "lkc-abc123",
            "spec": {
                "display_name": "orders",
                "cloud": "AWS",
                "region": "us-east-2",
                "config": {"kind": "Standard"},
                "environment": {"id": "env-1"}
            },
            "status": {"phase": "FAILED"}
        });

        let cluster: KafkaCluster = serde_json::from_value(body).unwrap();
        assert_eq!(cluster.status.phase, PHASE_FAILED);
    }
}
