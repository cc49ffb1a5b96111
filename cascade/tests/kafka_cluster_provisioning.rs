//! Integration tests for the cluster resource lifecycle against a mock
//! control plane

use cascade::CascadeProvider;
use mockito::Server;
use tfcore::context::Context;
use tfcore::provider::{ConfigureProviderRequest, Provider};
use tfcore::resource::{
    ConfigureResourceRequest, CreateResourceRequest, ReadResourceRequest,
};
use tfcore::types::{AttributePath, DynamicValue};

async fn configured_cluster_resource(
    server: &Server,
) -> Box<dyn tfcore::resource::ResourceWithConfigure> {
    let mut config = DynamicValue::empty();
    let _ = config.set_string(&AttributePath::new("endpoint"), server.url());
    let _ = config.set_string(&AttributePath::new("api_key"), "key-1".to_string());
    let _ = config.set_string(&AttributePath::new("api_secret"), "secret-1".to_string());

    let mut provider = CascadeProvider::new();
    let configure_response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
            },
        )
        .await;
    assert!(configure_response.diagnostics.is_empty());

    let factories = provider.resources();
    let mut resource = factories.get("cascade_kafka_cluster").unwrap()();
    let configure_resource_response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: configure_response.provider_data,
            },
        )
        .await;
    assert!(configure_resource_response.diagnostics.is_empty());
    resource
}

fn cluster_config() -> DynamicValue {
    let mut config = DynamicValue::empty();
    let _ = config.set_string(&AttributePath::new("display_name"), "orders".to_string());
    let _ = config.set_string(&AttributePath::new("cloud"), "AWS".to_string());
    let _ = config.set_string(&AttributePath::new("region"), "us-east-2".to_string());
    let _ = config.set_string(&AttributePath::new("type"), "standard".to_string());
    let _ = config.set_string(&AttributePath::new("environment_id"), "env-1".to_string());
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn create_waits_for_provisioned_phase() {
    let mut server = Server::new_async().await;

    let _create_mock = server
        .mock("POST", "/cmk/v2/clusters")
        .with_body(
            r#"{
                "id": "lkc-1",
                "spec": {
                    "display_name": "orders",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "config": {"kind": "Standard"},
                    "environment": {"id": "env-1"}
                },
                "status": {"phase": "PROVISIONING"}
            }"#,
        )
        .create_async()
        .await;

    let poll_mock = server
        .mock("GET", "/cmk/v2/clusters/lkc-1?environment=env-1")
        .with_body(
            r#"{
                "id": "lkc-1",
                "spec": {
                    "display_name": "orders",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "config": {"kind": "Standard"},
                    "environment": {"id": "env-1"},
                    "kafka_bootstrap_endpoint": "SASL_SSL://lkc-1.example:9092",
                    "http_endpoint": "https://lkc-1.example"
                },
                "status": {"phase": "PROVISIONED"}
            }"#,
        )
        .expect_at_least(1)
        .create_async()
        .await;

    let resource = configured_cluster_resource(&server).await;

    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "cascade_kafka_cluster".to_string(),
                planned_state: cluster_config(),
                config: cluster_config(),
                planned_private: vec![],
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "lkc-1"
    );
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("bootstrap_endpoint"))
            .unwrap(),
        "SASL_SSL://lkc-1.example:9092"
    );
    poll_mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn create_surfaces_failed_provisioning() {
    let mut server = Server::new_async().await;

    let _create_mock = server
        .mock("POST", "/cmk/v2/clusters")
        .with_body(
            r#"{
                "id": "lkc-2",
                "spec": {
                    "display_name": "orders",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "config": {"kind": "Standard"},
                    "environment": {"id": "env-1"}
                },
                "status": {"phase": "PROVISIONING"}
            }"#,
        )
        .create_async()
        .await;

    // FAILED is outside both state sets, so the wait aborts on the first
    // poll instead of running out the clock.
    let _poll_mock = server
        .mock("GET", "/cmk/v2/clusters/lkc-2?environment=env-1")
        .with_body(
            r#"{
                "id": "lkc-2",
                "spec": {
                    "display_name": "orders",
                    "cloud": "AWS",
                    "region": "us-east-2",
                    "config": {"kind": "Standard"},
                    "environment": {"id": "env-1"}
                },
                "status": {"phase": "FAILED"}
            }"#,
        )
        .expect(1)
        .create_async()
        .await;

    let resource = configured_cluster_resource(&server).await;

    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "cascade_kafka_cluster".to_string(),
                planned_state: cluster_config(),
                config: cluster_config(),
                planned_private: vec![],
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0]
        .summary
        .contains("did not reach PROVISIONED"));
    // The cluster ID survives so the practitioner can destroy it.
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "lkc-2"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn read_detects_deleted_cluster() {
    let mut server = Server::new_async().await;

    let _get_mock = server
        .mock("GET", "/cmk/v2/clusters/lkc-9?environment=env-1")
        .with_status(404)
        .create_async()
        .await;

    let resource = configured_cluster_resource(&server).await;

    let mut state = cluster_config();
    let _ = state.set_string(&AttributePath::new("id"), "lkc-9".to_string());

    let response = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "cascade_kafka_cluster".to_string(),
                current_state: state,
                private: vec![],
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert!(response.new_state.is_none());
}
