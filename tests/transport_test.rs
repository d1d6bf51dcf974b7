mod common;

use bridge_scout::core::error::{FailureKind, TransportError};
use bridge_scout::transport::FetchProfile;
use common::{init_logger, transport_with, RecordingBackoff, TEST_AGENT};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn rate_limited_twice_then_ok() {
    init_logger();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/phones"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/phones"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .with_priority(2)
        .mount(&server)
        .await;

    let policy = Arc::new(RecordingBackoff::default());
    let transport = transport_with(policy.clone());

    let response = transport
        .fetch(&format!("{}/phones", server.uri()), FetchProfile::Scrape)
        .await
        .expect("third attempt should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "<table></table>");
    assert_eq!(
        policy.calls(),
        vec![(1, FailureKind::RateLimited), (2, FailureKind::RateLimited)]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn server_errors_exhaust_budget() {
    init_logger();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let policy = Arc::new(RecordingBackoff::default());
    let transport = transport_with(policy.clone());

    let err = transport
        .fetch(&format!("{}/down", server.uri()), FetchProfile::Feed)
        .await
        .unwrap_err();

    match err {
        TransportError::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"), "unexpected error: {}", last_error);
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
    // No sleep after the final attempt.
    assert_eq!(policy.count(FailureKind::Transient), 2);
    assert_eq!(policy.count(FailureKind::RateLimited), 0);
}

#[tokio::test]
async fn not_found_is_retried_like_other_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let policy = Arc::new(RecordingBackoff::default());
    let transport = transport_with(policy.clone()).with_max_attempts(2);

    let result = transport
        .fetch(&format!("{}/gone", server.uri()), FetchProfile::Scrape)
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Exhausted { attempts: 2, .. })
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
    assert_eq!(policy.calls(), vec![(1, FailureKind::Transient)]);
}

#[tokio::test]
async fn connection_refused_is_transient() {
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let policy = Arc::new(RecordingBackoff::default());
    let transport = transport_with(policy.clone());

    let result = transport
        .fetch(&format!("{}/nothing-here", uri), FetchProfile::Scrape)
        .await;
    assert!(matches!(
        result,
        Err(TransportError::Exhausted { attempts: 3, .. })
    ));
    assert_eq!(policy.count(FailureKind::Transient), 2);
}

#[tokio::test]
async fn sends_rotated_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", TEST_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let policy = Arc::new(RecordingBackoff::default());
    let response = transport_with(policy.clone())
        .fetch(&server.uri(), FetchProfile::Scrape)
        .await
        .unwrap();

    assert_eq!(response.identity.user_agent, TEST_AGENT);
    assert!(response.identity.proxy_endpoint.is_none());
    assert!(policy.calls().is_empty());
}
