//! Consul agent 注册中心测试
//!
//! 使用 wiremock 模拟 Consul HTTP API，校验请求形状

mod common;

use common::MockSource;
use flare_registry_sync::error::{ProviderError, SyncError};
use flare_registry_sync::provider::ProviderOptions;
use flare_registry_sync::reconciler::{ErrorPolicy, Reconcile, Reconciler};
use flare_registry_sync::registry::consul::{ConsulClientConfig, DEFAULT_TAG};
use flare_registry_sync::registry::{ConsulAgentRegistry, ConsulClient, Registry};
use flare_registry_sync::service::Service;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry(server: &MockServer) -> ConsulAgentRegistry {
    let client = ConsulClient::new(ConsulClientConfig::new(server.uri())).unwrap();
    ConsulAgentRegistry::new(client, DEFAULT_TAG)
}

#[tokio::test]
async fn test_fetch_filters_by_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .and(query_param("filter", "\"flare-sync\" in Tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "svc-b-1": {
                "ID": "svc-b-1",
                "Service": "svc-b",
                "Tags": ["flare-sync", "web"],
                "Address": "10.0.0.2",
                "Port": 8080,
                "Meta": {"version": "2"}
            },
            "svc-a": {
                "ID": "svc-a",
                "Service": "svc-a",
                "Tags": ["flare-sync"],
                "Address": "10.0.0.1",
                "Port": 0,
                "Meta": null
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let services = registry(&server)
        .fetch(&CancellationToken::new())
        .await
        .unwrap();

    let identities: Vec<&str> = services.iter().map(Service::identity).collect();
    assert_eq!(identities, vec!["svc-a", "svc-b-1"]);

    let a = services.lookup("svc-a").unwrap();
    assert_eq!(a.port, None);
    assert!(a.metadata.is_empty());

    let b = services.lookup("svc-b-1").unwrap();
    assert_eq!(b.name, "svc-b");
    assert_eq!(b.port, Some(8080));
    assert!(b.tags.contains("web"));
    assert_eq!(b.metadata.get("version").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_register_merges_common_tag() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .and(body_json(json!({
            "ID": "svc-a-1",
            "Name": "svc-a",
            "Tags": ["flare-sync", "web"],
            "Address": "10.0.0.1",
            "Port": 8080,
            "Meta": {"version": "1"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let service = Service::new("svc-a", "10.0.0.1")
        .with_id("svc-a-1")
        .with_port(8080)
        .with_tag("web")
        .with_tag("flare-sync")
        .with_metadata("version", "1");

    registry(&server)
        .register(&CancellationToken::new(), &service)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_invalid_service_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // 校验由对账器执行，注册中心本身不重复校验
    let registry = Arc::new(registry(&server));
    let service = Service::new("svc-a", "");
    assert!(registry.validate(&service).is_err());

    let reconciler = Reconciler::new(
        Arc::new(MockSource::new(vec![service])),
        registry,
        ErrorPolicy::Exit,
    );
    let err = reconciler.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SyncError::Register(_)));
}

#[tokio::test]
async fn test_deregister_by_identity() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/svc-a-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let service = Service::new("svc-a", "10.0.0.1").with_id("svc-a-1");
    registry(&server)
        .deregister(&CancellationToken::new(), &service)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deregister_escapes_reserved_characters() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/web"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    for encoded in ["web%232", "web%3F2", "team%2Fweb"] {
        Mock::given(method("PUT"))
            .and(path(format!("/v1/agent/service/deregister/{}", encoded)))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let registry = registry(&server);
    for id in ["web#2", "web?2", "team/web"] {
        let service = Service::new("web", "10.0.0.1").with_id(id);
        registry
            .deregister(&CancellationToken::new(), &service)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_deregister_slash_identity_is_not_treated_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/team%2Fweb"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rpc error"))
        .expect(1)
        .mount(&server)
        .await;

    let service = Service::new("web", "10.0.0.1").with_id("team/web");
    let err = registry(&server)
        .deregister(&CancellationToken::new(), &service)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_dot_segment_identity_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = Service::new("web", "10.0.0.1").with_id("..");
    let err = registry(&server)
        .deregister(&CancellationToken::new(), &service)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Backend(_)));
}

#[tokio::test]
async fn test_deregister_absent_service_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/svc-a"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Unknown service ID"))
        .mount(&server)
        .await;

    let result = registry(&server)
        .deregister(&CancellationToken::new(), &Service::new("svc-a", "10.0.0.1"))
        .await;
    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rpc error\n"))
        .mount(&server)
        .await;

    let err = registry(&server)
        .fetch(&CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        ProviderError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "rpc error");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_token_and_datacenter_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .and(header("X-Consul-Token", "secret"))
        .and(query_param("dc", "dc1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let options = ProviderOptions::new()
        .with("address", server.uri())
        .with("token", "secret")
        .with("datacenter", "dc1")
        .with("tag", DEFAULT_TAG);
    let registry = ConsulAgentRegistry::from_options(&options).unwrap();

    let services = registry.fetch(&CancellationToken::new()).await.unwrap();
    assert!(services.is_empty());
}

#[tokio::test]
async fn test_cancelled_request() {
    let server = MockServer::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = registry(&server).fetch(&cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn test_address_without_scheme() {
    let client = ConsulClient::new(ConsulClientConfig::new("consul.service:8500/")).unwrap();
    assert_eq!(client.base_url(), "http://consul.service:8500");
}

#[test]
fn test_url_keeps_address_path_prefix() {
    let client = ConsulClient::new(ConsulClientConfig::new("http://gateway:8080/consul/")).unwrap();
    let url = client.url(&["v1", "agent", "service", "deregister", "a/b"]).unwrap();
    assert_eq!(
        url.as_str(),
        "http://gateway:8080/consul/v1/agent/service/deregister/a%2Fb"
    );
}
