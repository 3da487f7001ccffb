//! Router-level tests over a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use sefaz_api::build_router;
use sefaz_core::{Environment, NATIONAL_KEY};
use sefaz_engine::{EndpointCache, EnginePolicy, StatusEngine};
use sefaz_probe::{ProbeClient, ScriptedReply, ScriptedTransport};
use sefaz_registry::{RegionRegistry, RegistryDocument};

const SP_URL: &str = "https://nfe.sefaz.sp.gov.br/ws/NfeStatusServico4.asmx";
const NATIONAL_URL: &str = "https://www.nfe.fazenda.gov.br/NFeStatusServico/NFeStatusServico4.asmx";

fn test_router() -> (Router, Arc<ScriptedTransport>) {
    let mut doc = RegistryDocument::new();
    doc.set("SP", Environment::Production, SP_URL);
    doc.set(NATIONAL_KEY, Environment::Production, NATIONAL_URL);

    let transport = Arc::new(ScriptedTransport::new());
    transport
        .on_post(SP_URL, ScriptedReply::status("107", "Servico em Operacao"))
        .on_post(NATIONAL_URL, ScriptedReply::http_status(500));

    let client = ProbeClient::new(transport.clone())
        .with_timeouts(Duration::from_millis(300), Duration::from_millis(100));
    let cache = Arc::new(EndpointCache::new(Duration::from_secs(60), 2));
    let engine = StatusEngine::new(
        RegionRegistry::in_memory(doc),
        client,
        cache,
        EnginePolicy::default(),
    );
    (build_router(engine), transport)
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_status_reports_both_sides() {
    let (router, _) = test_router();

    let req = Request::builder()
        .uri("/api/v1/status?region=SP&environment=production")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["region"], "SP");
    assert_eq!(data["environment"], "production");
    assert_eq!(data["status_regional"]["available"], true);
    assert_eq!(data["status_regional"]["reason_code"], "107");
    assert_eq!(data["status_national"]["available"], false);
    assert!(
        data["status_national"]["reason_text"]
            .as_str()
            .unwrap()
            .contains("transport status 500")
    );
}

#[tokio::test]
async fn post_status_matches_get() {
    let (router, _) = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/status")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"region":"sp","environment":"production"}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["data"]["region"], "SP");
    assert_eq!(body["data"]["status_regional"]["available"], true);
    assert_eq!(body["data"]["status_national"]["available"], false);
}

#[tokio::test]
async fn uf_alias_and_default_environment() {
    let (router, _) = test_router();

    let req = Request::builder()
        .uri("/api/v1/status?uf=SP")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["data"]["environment"], "production");
}

#[tokio::test]
async fn unknown_region_is_bad_request_without_network() {
    let (router, transport) = test_router();

    let req = Request::builder()
        .uri("/api/v1/status?region=ZZ")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json_body(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("ZZ"));
    assert_eq!(transport.total_posts(), 0);
}

#[tokio::test]
async fn unknown_environment_is_bad_request() {
    let (router, _) = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/status")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"region":"SP","environment":"staging"}"#))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn regions_lists_every_uf() {
    let (router, _) = test_router();

    let req = Request::builder()
        .uri("/api/v1/regions")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let regions = body["data"].as_array().unwrap();
    assert_eq!(regions.len(), 27);
    let sp = regions.iter().find(|r| r["code"] == "SP").unwrap();
    assert_eq!(sp["numeric_id"], "35");
    assert_eq!(sp["environments"]["production"], SP_URL);
}

#[tokio::test]
async fn healthz_is_ok() {
    let (router, _) = test_router();

    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
