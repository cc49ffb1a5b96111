//! Integration tests for provider configuration and data source reads

use cascade::CascadeProvider;
use mockito::Server;
use tfcore::context::Context;
use tfcore::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfcore::provider::{ConfigureProviderRequest, Provider};
use tfcore::types::{AttributePath, DynamicValue};

fn basic_config(endpoint: &str) -> DynamicValue {
    let mut config = DynamicValue::empty();
    let _ = config.set_string(&AttributePath::new("endpoint"), endpoint.to_string());
    let _ = config.set_string(&AttributePath::new("api_key"), "key-1".to_string());
    let _ = config.set_string(&AttributePath::new("api_secret"), "secret-1".to_string());
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_lifecycle_with_mock_server() {
    let mut server = Server::new_async().await;

    let _env_mock = server
        .mock("GET", "/org/v2/environments/env-1")
        .with_body(r#"{"id":"env-1","display_name":"production"}"#)
        .create_async()
        .await;

    let mut provider = CascadeProvider::new();
    let configure_response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: basic_config(&server.url()),
            },
        )
        .await;

    assert!(configure_response.diagnostics.is_empty());
    assert!(configure_response.provider_data.is_some());

    let factories = provider.data_sources();
    let factory = factories.get("cascade_environment").unwrap();
    let mut environment_ds = factory();

    let configure_ds_response = environment_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;
    assert!(configure_ds_response.diagnostics.is_empty());

    let mut ds_config = DynamicValue::empty();
    let _ = ds_config.set_string(&AttributePath::new("id"), "env-1".to_string());

    let read_response = environment_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "cascade_environment".to_string(),
                config: ds_config,
            },
        )
        .await;

    assert!(read_response.diagnostics.is_empty());
    assert_eq!(
        read_response
            .state
            .get_string(&AttributePath::new("display_name"))
            .unwrap(),
        "production"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn environment_lookup_by_display_name() {
    let mut server = Server::new_async().await;

    let _list_mock = server
        .mock("GET", "/org/v2/environments")
        .with_body(
            r#"{"data":[
                {"id":"env-1","display_name":"production"},
                {"id":"env-2","display_name":"staging"}
            ]}"#,
        )
        .create_async()
        .await;

    let mut provider = CascadeProvider::new();
    let configure_response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: basic_config(&server.url()),
            },
        )
        .await;

    let factories = provider.data_sources();
    let mut environment_ds = factories.get("cascade_environment").unwrap()();
    environment_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: configure_response.provider_data.clone(),
            },
        )
        .await;

    let mut ds_config = DynamicValue::empty();
    let _ = ds_config.set_string(&AttributePath::new("display_name"), "staging".to_string());

    let read_response = environment_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "cascade_environment".to_string(),
                config: ds_config,
            },
        )
        .await;

    assert!(read_response.diagnostics.is_empty());
    assert_eq!(
        read_response
            .state
            .get_string(&AttributePath::new("id"))
            .unwrap(),
        "env-2"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn data_source_requires_configured_provider() {
    let provider = CascadeProvider::new();

    let factories = provider.data_sources();
    let mut environment_ds = factories.get("cascade_environment").unwrap()();

    let configure_ds_response = environment_ds
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: None,
            },
        )
        .await;

    assert!(!configure_ds_response.diagnostics.is_empty());
    assert!(configure_ds_response.diagnostics[0]
        .summary
        .contains("No provider data"));

    let mut ds_config = DynamicValue::empty();
    let _ = ds_config.set_string(&AttributePath::new("id"), "env-1".to_string());

    let read_response = environment_ds
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "cascade_environment".to_string(),
                config: ds_config,
            },
        )
        .await;

    assert!(!read_response.diagnostics.is_empty());
    assert!(read_response.diagnostics[0]
        .summary
        .contains("Provider not configured"));
}
