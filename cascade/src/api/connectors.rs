//! Managed connector API implementation
//!
//! Connectors are addressed by name under an environment and cluster pair.
//! Lifecycle states come from the status endpoint: PROVISIONING and
//! PENDING while starting, RUNNING once healthy, FAILED on terminal
//! errors. Deletion is asynchronous; the connector keeps answering reads
//! until it is fully torn down.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::ApiError;
use super::Client;

pub const CONNECTOR_STATE_PROVISIONING: &str = "PROVISIONING";
pub const CONNECTOR_STATE_PENDING: &str = "PENDING";
pub const CONNECTOR_STATE_RUNNING: &str = "RUNNING";
pub const CONNECTOR_STATE_FAILED: &str = "FAILED";

fn connectors_path(environment_id: &str, cluster_id: &str) -> String {
    format!(
        "/connect/v1/environments/{}/clusters/{}/connectors",
        environment_id, cluster_id
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connector {
    pub name: String,
    /// Full connector configuration, sensitive entries redacted by the
    /// server on read.
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub connector: ConnectorState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorState {
    pub state: String,
    #[serde(default)]
    pub trace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateConnectorRequest {
    pub name: String,
    pub config: HashMap<String, String>,
}

impl Client {
    /// GET /connect/v1/environments/{env}/clusters/{cluster}/connectors/{name}
    pub async fn get_connector(
        &self,
        environment_id: &str,
        cluster_id: &str,
        name: &str,
    ) -> Result<Connector, ApiError> {
        self.get(&format!(
            "{}/{}",
            connectors_path(environment_id, cluster_id),
            name
        ))
        .await
    }

    /// GET .../connectors/{name}/status
    pub async fn get_connector_status(
        &self,
        environment_id: &str,
        cluster_id: &str,
        name: &str,
    ) -> Result<ConnectorStatus, ApiError> {
        self.get(&format!(
            "{}/{}/status",
            connectors_path(environment_id, cluster_id),
            name
        ))
        .await
    }

    /// POST /connect/v1/environments/{env}/clusters/{cluster}/connectors
    pub async fn create_connector(
        &self,
        environment_id: &str,
        cluster_id: &str,
        request: &CreateConnectorRequest,
    ) -> Result<Connector, ApiError> {
        self.post(&connectors_path(environment_id, cluster_id), request)
            .await
    }

    /// PUT-semantics config replacement via the config subresource.
    /// The server merges nothing; the submitted map is the new config.
    pub async fn update_connector_config(
        &self,
        environment_id: &str,
        cluster_id: &str,
        name: &str,
        config: &HashMap<String, String>,
    ) -> Result<Connector, ApiError> {
        self.patch(
            &format!(
                "{}/{}/config",
                connectors_path(environment_id, cluster_id),
                name
            ),
            config,
        )
        .await
    }

    /// DELETE .../connectors/{name}
    pub async fn delete_connector(
        &self,
        environment_id: &str,
        cluster_id: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.delete(&format!(
            "{}/{}",
            connectors_path(environment_id, cluster_id),
            name
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_deserializes_nested_state() {
        let body = serde_json::json!({
            "name": "s3-sink",
            "connector": {"state": "RUNNING"}
        });

        let status: ConnectorStatus = serde_json::from_value(body).unwrap();
        assert_eq!(status.connector.state, CONNECTOR_STATE_RUNNING);
        assert!(status.connector.trace.is_none());
    }

    #[test]
    fn failed_status_carries_trace() {
        let body = serde_json::json!({
            "name": "s3-sink",
            "connector": {
                "state": "FAILED",
                "trace": "org.apache.kafka.connect.errors.ConnectException: bucket not found"
            }
        });

        let status: ConnectorStatus = serde_json::from_value(body).unwrap();
        assert_eq!(status.connector.state, CONNECTOR_STATE_FAILED);
        assert!(status.connector.trace.unwrap().contains("bucket not found"));
    }
}
