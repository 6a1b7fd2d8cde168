//! Tests for the HTTP transport module

use super::*;
use crate::config::{ApiConfig, TransportConfig};
use crate::error::Error;
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_transport(base_url: &str) -> Transport {
    let api = ApiConfig {
        base_url: base_url.to_string(),
        application_id: "app-test".to_string(),
    };
    let config = TransportConfig {
        max_retries: 3,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(100),
        auth_requests_per_minute: 1000,
        data_requests_per_minute: 1000,
        ..TransportConfig::default()
    };
    Transport::new(&api, config).unwrap()
}

// ============================================================================
// Endpoint classification
// ============================================================================

#[test]
fn test_endpoint_classification() {
    assert_eq!(
        EndpointClass::classify("/auth"),
        EndpointClass::Authorization
    );
    assert_eq!(
        EndpointClass::classify("/sessions"),
        EndpointClass::Authorization
    );
    assert_eq!(
        EndpointClass::classify("/application"),
        EndpointClass::Authorization
    );
    assert_eq!(
        EndpointClass::classify("/accounts/abc/balances"),
        EndpointClass::AccountData
    );
    assert_eq!(
        EndpointClass::classify("accounts/abc/transactions"),
        EndpointClass::AccountData
    );
}

// ============================================================================
// Rate limiter
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_admits_under_limit() {
    let limiter = RateLimiter::new(2);
    let start = tokio::time::Instant::now();

    limiter.acquire().await;
    limiter.acquire().await;

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.in_flight().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_third_acquire_suspends() {
    let limiter = RateLimiter::new(2);

    limiter.acquire().await;
    limiter.acquire().await;

    // Third call must wait until the oldest admission leaves the window.
    let start = tokio::time::Instant::now();
    limiter.acquire().await;
    assert!(start.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_window_slides() {
    let limiter = RateLimiter::new(2);

    limiter.acquire().await;
    limiter.acquire().await;

    tokio::time::advance(Duration::from_secs(61)).await;

    // Old admissions have left the window; new ones are immediate.
    let start = tokio::time::Instant::now();
    limiter.acquire().await;
    limiter.acquire().await;
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_never_exceeds_limit_per_window() {
    let limit = 5u32;
    let limiter = RateLimiter::new(limit);
    let mut admissions = Vec::new();

    for _ in 0..12 {
        limiter.acquire().await;
        admissions.push(tokio::time::Instant::now());
    }

    for (i, &start) in admissions.iter().enumerate() {
        let in_window = admissions[i..]
            .iter()
            .filter(|&&t| t.duration_since(start) < Duration::from_secs(60))
            .count();
        assert!(
            in_window <= limit as usize,
            "window starting at admission {i} holds {in_window} admissions"
        );
    }
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_send_parses_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/a1/balances"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"balances": []})),
        )
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let body = transport
        .get("/accounts/a1/balances", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(
        body,
        ResponseBody::Json(serde_json::json!({"balances": []}))
    );
}

#[tokio::test]
async fn test_send_carries_unparsable_body_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text, not json"))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let body = transport
        .get("/accounts/raw", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Text("plain text, not json".to_string()));
}

#[tokio::test]
async fn test_send_forwards_headers_query_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(header("PSU-IP-Address", "10.0.0.1"))
        .and(query_param("state", "xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let body = transport
        .post(
            "/auth",
            RequestConfig::new()
                .header("PSU-IP-Address", "10.0.0.1")
                .query("state", "xyz")
                .json(serde_json::json!({"aspsp": "Test Bank"})),
        )
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Json(serde_json::json!({"ok": true})));
}

#[tokio::test]
async fn test_4xx_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "gone"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let result = transport.get("/accounts/missing", RequestConfig::new()).await;

    match result {
        Err(Error::NotFound { message }) => assert_eq!(message, "gone"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;
    for (route, status) in [("/e400", 400u16), ("/e401", 401), ("/e403", 403), ("/e418", 418)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
    }

    let transport = test_transport(&server.uri());

    assert!(matches!(
        transport.get("/e400", RequestConfig::new()).await,
        Err(Error::InvalidRequest { .. })
    ));
    assert!(matches!(
        transport.get("/e401", RequestConfig::new()).await,
        Err(Error::Unauthorized { .. })
    ));
    assert!(matches!(
        transport.get("/e403", RequestConfig::new()).await,
        Err(Error::Forbidden { .. })
    ));
    assert!(matches!(
        transport.get("/e418", RequestConfig::new()).await,
        Err(Error::GenericHttp { status: 418, .. })
    ));
}

#[tokio::test]
async fn test_429_surfaces_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .insert_header("X-Request-ID", "req-789"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let result = transport.get("/accounts/limited", RequestConfig::new()).await;

    match result {
        Err(Error::RateLimited {
            retry_after_seconds,
            request_id,
        }) => {
            assert_eq!(retry_after_seconds, 30);
            assert_eq!(request_id.as_deref(), Some("req-789"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_429_retry_after_defaults_to_60() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let result = transport.get("/accounts/limited", RequestConfig::new()).await;

    match result {
        Err(Error::RateLimited {
            retry_after_seconds,
            request_id,
        }) => {
            assert_eq!(retry_after_seconds, 60);
            assert_eq!(request_id, None);
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_500_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let transport = test_transport(&server.uri());
    let body = transport
        .get("/accounts/flaky", RequestConfig::new())
        .await
        .unwrap();

    assert_eq!(body, ResponseBody::Json(serde_json::json!({"ok": true})));
}

#[tokio::test]
async fn test_retry_cap_on_persistent_500() {
    let server = MockServer::start().await;
    // max_retries = 2 means at most 3 attempts total.
    Mock::given(method("GET"))
        .and(path("/accounts/broken"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "boom"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let api = ApiConfig {
        base_url: server.uri(),
        application_id: "app-test".to_string(),
    };
    let config = TransportConfig {
        max_retries: 2,
        initial_backoff: Duration::from_millis(10),
        ..TransportConfig::default()
    };
    let transport = Transport::new(&api, config).unwrap();

    let result = transport.get("/accounts/broken", RequestConfig::new()).await;
    match result {
        Err(Error::ServerError { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected ServerError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_maps_to_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let api = ApiConfig {
        base_url: server.uri(),
        application_id: "app-test".to_string(),
    };
    let config = TransportConfig {
        timeout: Duration::from_millis(200),
        max_retries: 0,
        ..TransportConfig::default()
    };
    let transport = Transport::new(&api, config).unwrap();

    let result = transport.get("/accounts/slow", RequestConfig::new()).await;
    assert!(matches!(result, Err(Error::Timeout { timeout_ms: 200 })));
}

#[tokio::test]
async fn test_connection_failure_maps() {
    // Nothing listens on this port.
    let api = ApiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        application_id: "app-test".to_string(),
    };
    let config = TransportConfig {
        max_retries: 0,
        ..TransportConfig::default()
    };
    let transport = Transport::new(&api, config).unwrap();

    let result = transport.get("/accounts/a1", RequestConfig::new()).await;
    assert!(matches!(result, Err(Error::ConnectionFailure { .. })));
}

#[test]
fn test_backoff_delay_is_exponential_and_capped() {
    let api = ApiConfig {
        base_url: "https://api.example.test".to_string(),
        application_id: "app-test".to_string(),
    };
    let config = TransportConfig {
        initial_backoff: Duration::from_secs(1),
        backoff_factor: 2.0,
        max_backoff: Duration::from_secs(8),
        ..TransportConfig::default()
    };
    let transport = Transport::new(&api, config).unwrap();

    assert_eq!(transport.backoff_delay(0), Duration::from_secs(1));
    assert_eq!(transport.backoff_delay(1), Duration::from_secs(2));
    assert_eq!(transport.backoff_delay(2), Duration::from_secs(4));
    assert_eq!(transport.backoff_delay(3), Duration::from_secs(8));
    assert_eq!(transport.backoff_delay(10), Duration::from_secs(8));
}

#[test]
fn test_mask_sensitive() {
    assert_eq!(mask_sensitive("short"), "****");
    let masked = mask_sensitive("eyJhbGciOiJSUzI1NiJ9.payload.signature");
    assert!(masked.starts_with("eyJh"));
    assert!(masked.contains("****"));
    assert!(!masked.contains("payload"));
}
