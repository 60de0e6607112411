//! Integration tests for the request pipeline.
//!
//! These tests run the client against a local mock server and verify
//! classification, retry counts, envelope handling and header assembly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bakery_api::auth::MemoryCredentialStore;
use bakery_api::clients::{DecodeError, RequestBody};
use bakery_api::{
    ApiClient, BaseUrl, ClientConfig, ErrorCode, HttpError, HttpMethod, RequestOptions, Session,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Food {
    food_id: u64,
    food_name: String,
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .base_url(BaseUrl::new(format!("{}/api", server.uri())).unwrap())
        .default_retry_delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(config_for(server)).unwrap()
}

fn client_with_token(server: &MockServer, token: &str) -> ApiClient {
    ApiClient::builder(config_for(server))
        .credential_store(Arc::new(MemoryCredentialStore::with_session(Session::new(
            token, "admin", "Ayu",
        ))))
        .build()
        .unwrap()
}

fn quiet(client: &ApiClient, max_retries: u32) -> RequestOptions {
    client
        .options()
        .max_retries(max_retries)
        .show_toast(false)
        .build()
        .unwrap()
}

// ============================================================================
// Normalization
// ============================================================================

#[tokio::test]
async fn test_bare_array_is_returned_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"food_id": 1, "food_name": "Mochi"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let foods: Vec<Food> = assert_ok!(client.get("/foods", None).await);

    assert_eq!(
        foods,
        vec![Food {
            food_id: 1,
            food_name: "Mochi".to_string()
        }]
    );
}

#[tokio::test]
async fn test_success_envelope_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/branches/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {"branch_id": 3}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value = client
        .request_value("branches/3", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(value, json!({"branch_id": 3}));
}

#[tokio::test]
async fn test_in_band_failure_on_200_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": {"message": "Branch is closed", "statusCode": 400, "details": {"branch_id": 3}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result: Result<Value, HttpError> = client
        .post("/orders", &json!({"branch_id": 3}), Some(quiet(&client, 2)))
        .await;

    let error = assert_err!(result);
    let api_error = error.as_api_error().unwrap();
    assert_eq!(api_error.code(), ErrorCode::ValidationError);
    assert_eq!(api_error.message(), "Branch is closed");
    assert_eq!(api_error.status_code(), Some(200));
    assert_eq!(api_error.details(), Some(&json!({"branch_id": 3})));
}

#[tokio::test]
async fn test_in_band_failure_without_status_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/recap"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .request_value("/recap", quiet(&client, 0))
        .await
        .unwrap_err();

    assert_eq!(error.code(), ErrorCode::UnknownError);
    assert_eq!(error.message(), "Server error.");
}

#[tokio::test]
async fn test_malformed_envelope_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": "yes"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .request_value("/foods", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        HttpError::Decode(DecodeError::MalformedEnvelope { .. })
    ));
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_invalid_json_on_success_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"food_id\": ", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .request_value("/foods", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(error, HttpError::Decode(DecodeError::InvalidJson { .. })));
}

#[tokio::test]
async fn test_shape_mismatch_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"food_id": "one"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result: Result<Vec<Food>, HttpError> = client.get("/foods", None).await;

    assert!(matches!(
        result,
        Err(HttpError::Decode(DecodeError::UnexpectedShape { .. }))
    ));
}

#[tokio::test]
async fn test_text_body_is_returned_as_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value = client
        .request_value("/health", RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(value, Value::String("ok".to_string()));
}

#[tokio::test]
async fn test_empty_json_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/foods/9"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("", "application/json"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value: Value = client.delete("/foods/9", None).await.unwrap();

    assert_eq!(value, Value::Null);
}

// ============================================================================
// Classification
// ============================================================================

#[tokio::test]
async fn test_status_table() {
    let server = MockServer::start().await;
    let table: [(u16, ErrorCode, bool); 9] = [
        (400, ErrorCode::ValidationError, false),
        (401, ErrorCode::AuthenticationError, false),
        (403, ErrorCode::AuthorizationError, false),
        (404, ErrorCode::UnknownError, false),
        (429, ErrorCode::RateLimitError, true),
        (500, ErrorCode::ServerError, true),
        (502, ErrorCode::ServerError, true),
        (503, ErrorCode::ServerError, true),
        (504, ErrorCode::ServerError, true),
    ];

    for (status, _, _) in table {
        Mock::given(method("GET"))
            .and(path(format!("/api/status/{status}")))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    for (status, code, retryable) in table {
        let error = client
            .request_value(&format!("/status/{status}"), quiet(&client, 0))
            .await
            .unwrap_err();
        let api_error = error.as_api_error().unwrap();

        assert_eq!(api_error.code(), code, "status {status}");
        assert_eq!(api_error.retryable(), retryable, "status {status}");
        assert_eq!(api_error.status_code(), Some(status));
        assert_eq!(api_error.message(), code.default_message());
    }
}

#[tokio::test]
async fn test_server_message_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/foods"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": {"message": "food_name is required"}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result: Result<Value, HttpError> = client
        .post("/foods", &json!({}), Some(quiet(&client, 0)))
        .await;
    let error = result.unwrap_err();

    assert_eq!(error.code(), ErrorCode::ValidationError);
    assert_eq!(error.message(), "food_name is required");
}

#[tokio::test]
async fn test_server_code_overrides_status_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "INVALID_CREDENTIALS", "message": "Wrong password"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = client
        .options()
        .max_retries(0)
        .show_toast(false)
        .skip_auth(true)
        .build()
        .unwrap();
    let result: Result<Value, HttpError> = client
        .post("/auth/login", &json!({"username": "ayu"}), Some(options))
        .await;

    let error = result.unwrap_err();
    assert_eq!(error.code(), ErrorCode::AuthenticationError);
    assert_eq!(error.message(), "Wrong password");
}

#[tokio::test]
async fn test_html_error_page_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(502).set_body_raw("<html>Bad Gateway</html>", "text/html"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .request_value("/foods", quiet(&client, 0))
        .await
        .unwrap_err();

    assert_eq!(error.code(), ErrorCode::ServerError);
    assert_eq!(error.message(), ErrorCode::ServerError.default_message());
}

#[tokio::test]
async fn test_timeout_is_classified_and_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = client
        .options()
        .timeout(Duration::from_millis(50))
        .max_retries(1)
        .retry_delay(Duration::from_millis(1))
        .show_toast(false)
        .build()
        .unwrap();

    let error = client.request_value("/slow", options).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::TimeoutError);
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = ClientConfig::builder()
        .base_url(BaseUrl::new("http://127.0.0.1:1/api").unwrap())
        .build()
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    let retries = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&retries);
    let options = client
        .options()
        .max_retries(1)
        .retry_delay(Duration::from_millis(1))
        .show_toast(false)
        .on_retry(move |attempt, error| seen.lock().unwrap().push((attempt, error.code())))
        .build()
        .unwrap();

    let error = client.request_value("/foods", options).await.unwrap_err();

    assert_eq!(error.code(), ErrorCode::NetworkError);
    assert_eq!(*retries.lock().unwrap(), vec![(1, ErrorCode::NetworkError)]);
}

// ============================================================================
// Retry
// ============================================================================

#[tokio::test]
async fn test_retries_until_success_with_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders/1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/orders/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"id": 1}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let retries = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&retries);
    let options = client
        .options()
        .max_retries(2)
        .retry_delay(Duration::from_millis(20))
        .on_retry(move |attempt, _| seen.lock().unwrap().push(attempt))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let value = client.request_value("/orders/1", options).await.unwrap();

    assert_eq!(value, json!({"id": 1}));
    assert_eq!(*retries.lock().unwrap(), vec![1, 2]);
    // 20ms then 40ms of backoff
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn test_exhausted_retries_make_n_plus_one_attempts() {
    for max_retries in [0_u32, 1, 3] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/foods"))
            .respond_with(ResponseTemplate::new(503))
            .expect(u64::from(max_retries) + 1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let error = client
            .request_value("/foods", quiet(&client, max_retries))
            .await
            .unwrap_err();

        assert_eq!(error.code(), ErrorCode::ServerError);
        server.verify().await;
    }
}

#[tokio::test]
async fn test_rate_limit_with_zero_retries_fails_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let retried = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&retried);
    let options = client
        .options()
        .max_retries(0)
        .show_toast(false)
        .on_retry(move |_, _| *flag.lock().unwrap() = true)
        .build()
        .unwrap();

    let error = client.request_value("/foods", options).await.unwrap_err();

    assert_eq!(error.code(), ErrorCode::RateLimitError);
    assert!(error.is_retryable());
    assert!(!*retried.lock().unwrap());
}

#[tokio::test]
async fn test_non_retryable_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/foods/1"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result: Result<Value, HttpError> = client
        .put("/foods/1", &json!({"price": 12000}), Some(quiet(&client, 5)))
        .await;

    assert_eq!(result.unwrap_err().code(), ErrorCode::AuthorizationError);
}

#[tokio::test]
async fn test_idempotent_get_returns_same_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"branch_id": 1}])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first: Value = client.get("/branches", None).await.unwrap();
    let second: Value = client.get("/branches", None).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_legacy_profile_makes_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/foods"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = client
        .request_value("/foods", RequestOptions::legacy())
        .await
        .unwrap_err();

    assert_eq!(error.code(), ErrorCode::ServerError);
}

// ============================================================================
// Request assembly
// ============================================================================

#[tokio::test]
async fn test_bearer_token_from_store_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "tok-123");
    let orders: Vec<Value> = client.get("/orders", None).await.unwrap();

    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_skip_auth_sends_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(418))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "stale");
    let options = client.options().skip_auth(true).build().unwrap();
    let value: Value = client
        .post("/auth/login", &json!({"username": "ayu", "password": "x"}), Some(options))
        .await
        .unwrap();

    assert_eq!(value["token"], "new");
}

#[tokio::test]
async fn test_json_body_query_and_custom_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/orders/42/status"))
        .and(query_param("notify", "true"))
        .and(header("content-type", "application/json"))
        .and(header("x-branch-id", "3"))
        .and(body_json(json!({"status": "delivered"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = client
        .options()
        .header("X-Branch-Id", "3")
        .query_param("notify", "true")
        .build()
        .unwrap();
    let value: Value = client
        .patch("/orders/42/status", &json!({"status": "delivered"}), Some(options))
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_binary_body_keeps_its_own_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/delivery-orders/7/pdf"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"stored": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = RequestOptions {
        method: HttpMethod::Post,
        body: Some(RequestBody::Binary {
            bytes: b"%PDF-1.7".to_vec(),
            content_type: Some("application/pdf".to_string()),
        }),
        ..RequestOptions::default()
    };

    let value = client
        .request_value("/delivery-orders/7/pdf", options)
        .await
        .unwrap();
    assert_eq!(value, json!({"stored": true}));
}

#[tokio::test]
async fn test_invalid_header_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut options = RequestOptions::legacy();
    options.headers.insert("bad header".to_string(), "x".to_string());

    let error = client.request_value("/foods", options).await.unwrap_err();
    assert!(matches!(error, HttpError::InvalidRequest(_)));
}
