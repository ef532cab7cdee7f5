//! 运行时端到端测试：文件来源 → Consul agent（wiremock）

mod common;

use common::{MockRegistry, MockSource, service};
use flare_registry_sync::config::SyncConfig;
use flare_registry_sync::provider::ProviderCatalog;
use flare_registry_sync::reconciler::ErrorPolicy;
use flare_registry_sync::runtime::SyncRuntime;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(services_path: &str, consul_address: &str) -> SyncConfig {
    SyncConfig::from_toml(&format!(
        r#"
[source]
kind = "file"
options = {{ path = "{services_path}" }}

[registry]
kind = "consul-agent"
options = {{ address = "{consul_address}" }}

[manager]
exit_on_error = true
"#
    ))
    .unwrap()
}

#[tokio::test]
async fn test_run_once_against_consul_agent() {
    let dir = tempfile::tempdir().unwrap();
    let services_path = dir.path().join("services.yml");
    std::fs::write(
        &services_path,
        "- name: svc-a\n  address: 10.0.0.1\n  port: 8080\n",
    )
    .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "svc-old": {
                "ID": "svc-old",
                "Service": "svc-old",
                "Tags": ["flare-sync"],
                "Address": "10.0.0.9",
                "Port": 80
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/deregister/svc-old"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .and(body_json(json!({
            "Name": "svc-a",
            "Tags": ["flare-sync"],
            "Address": "10.0.0.1",
            "Port": 8080
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = ProviderCatalog::builtin().unwrap();
    let runtime =
        SyncRuntime::build(&config(services_path.to_str().unwrap(), &server.uri()), &catalog)
            .unwrap();
    assert_eq!(runtime.reconciler().policy(), ErrorPolicy::Exit);

    runtime.run_once(&CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn test_build_unknown_provider() {
    let config = SyncConfig::from_toml(
        r#"
source = { kind = "git" }
registry = { kind = "consul-agent" }
"#,
    )
    .unwrap();
    let catalog = ProviderCatalog::builtin().unwrap();

    let err = SyncRuntime::build(&config, &catalog).err().unwrap();
    assert_eq!(
        err.to_string(),
        "source provider with name \"git\" was not registered"
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_forever_until_cancelled() {
    let source = Arc::new(MockSource::new(vec![service("svc-a", "10.0.0.1")]));
    let registry = Arc::new(MockRegistry::new(vec![]));
    let runtime = SyncRuntime::new(
        source.clone(),
        registry.clone(),
        ErrorPolicy::Continue,
        Duration::from_secs(10),
    );
    let cancel = CancellationToken::new();

    let stopper = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            cancel.cancel();
        })
    };
    runtime.run_forever(cancel).await;
    stopper.await.unwrap();

    assert_eq!(source.fetches(), 2);
    assert_eq!(registry.register_calls(), vec!["svc-a", "svc-a"]);
}
