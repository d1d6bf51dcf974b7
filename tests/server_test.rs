mod common;

use bridge_scout::server;
use bridge_scout::ScoutContext;
use common::{config_for, context_for, RecordingBackoff};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the router on an ephemeral port and return its base URL.
async fn serve(ctx: ScoutContext) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(Arc::new(ctx)))
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn malformed_gtin_is_rejected_without_calling_the_bridge() {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":[]}"#))
        .expect(0)
        .mount(&bridge)
        .await;

    let ctx = context_for(config_for(&bridge.uri()), Arc::new(RecordingBackoff::default()));
    let base = serve(ctx).await;

    let response = client()
        .get(format!("{}/feeds/idealo?gtin=12345", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("13 digits"));

    assert!(bridge.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn valid_gtin_is_forwarded_to_the_bridge() {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("bridge", "IdealoBridge"))
        .and(query_param("gtin", "8806095212349"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[{"title":"Galaxy S25 FE","url":"https://shop.test/1","idealo_price":"479.00"}]}"#,
        ))
        .expect(1)
        .mount(&bridge)
        .await;

    let ctx = context_for(config_for(&bridge.uri()), Arc::new(RecordingBackoff::default()));
    let base = serve(ctx).await;

    let body: serde_json::Value = client()
        .get(format!("{}/feeds/idealo?gtin=8806095212349", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["available"], true);
    assert_eq!(body["entries"][0]["extra_fields"]["idealo_price"], "479.00");
}

#[tokio::test]
async fn unreachable_bridge_gives_empty_state_not_5xx() {
    let bridge = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&bridge)
        .await;

    let ctx = context_for(config_for(&bridge.uri()), Arc::new(RecordingBackoff::default()));
    let base = serve(ctx).await;

    let response = client()
        .get(format!("{}/feeds/engadget", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["available"], false);
    assert_eq!(body["entries"], serde_json::json!([]));
}

#[tokio::test]
async fn refresh_endpoint_always_refetches_sources() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/http.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("10.0.0.1:8080\n10.0.0.2:8080\n"))
        .expect(2)
        .mount(&upstream)
        .await;

    let mut config = config_for(&upstream.uri());
    config.proxy_sources = Some(vec![format!("{}/http.txt", upstream.uri())]);
    let ctx = context_for(config, Arc::new(RecordingBackoff::default()));
    let base = serve(ctx).await;

    for _ in 0..2 {
        let body: serde_json::Value = client()
            .post(format!("{}/proxies/refresh", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["proxies"], 2);
    }
}
