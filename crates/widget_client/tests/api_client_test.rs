//! HTTP-level tests for the widget API client

use serde_json::json;
use widget_client::{ApiError, ChatRequest, SendOtpRequest, VerifyOtpRequest, WidgetApi, WidgetApiClient};
use widget_core::WidgetConfig;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> WidgetApiClient {
    let config = WidgetConfig::new("client-1").with_api_url(format!("{}/", server.uri()));
    WidgetApiClient::new(&config).expect("client")
}

#[tokio::test]
async fn test_send_otp_posts_email_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/send-otp"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"email": "demo@test.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .send_otp(SendOtpRequest {
            email: "demo@test.com".into(),
        })
        .await
        .unwrap();
    assert!(response.success);
}

#[tokio::test]
async fn test_verify_otp_sends_client_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/verify-otp"))
        .and(body_json(
            json!({"email": "demo@test.com", "otp": "123456", "clientId": "client-1"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "token": "T",
            "user": {"email": "demo@test.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .verify_otp(VerifyOtpRequest {
            email: "demo@test.com".into(),
            otp: "123456".into(),
            client_id: "client-1".into(),
        })
        .await
        .unwrap();
    assert_eq!(response.credential().unwrap().token, "T");
}

#[tokio::test]
async fn test_chat_carries_bearer_and_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("Authorization", "Bearer T"))
        .and(body_json(json!({
            "clientId": "client-1",
            "query": "hello",
            "sessionId": "session_abcdefghi_1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Hi",
            "suggestions": ["A", "B"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .chat(
            "T",
            ChatRequest {
                client_id: "client-1".into(),
                query: "hello".into(),
                session_id: "session_abcdefghi_1".into(),
            },
        )
        .await
        .unwrap();
    let reply = response.resolve().unwrap();
    assert_eq!(reply.answer, "Hi");
    assert_eq!(reply.suggestions, vec!["A", "B"]);
}

#[tokio::test]
async fn test_error_status_body_is_still_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/send-otp"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"success": false, "message": "Mailer down"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .send_otp(SendOtpRequest {
            email: "demo@test.com".into(),
        })
        .await
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some("Mailer down"));
}

#[tokio::test]
async fn test_unauthorized_is_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/chat-history"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"success": false, "message": "Token expired"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).chat_history("stale").await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized(Some("Token expired".into())));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/verify-token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).verify_token("T").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_no_retry_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/resend-otp"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"success": false})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .resend_otp(SendOtpRequest {
            email: "demo@test.com".into(),
        })
        .await
        .unwrap();
    assert!(!response.success);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = WidgetConfig::new("client-1").with_api_url(format!("http://127.0.0.1:{port}"));
    let client = WidgetApiClient::new(&config).unwrap();

    let err = client.verify_token("T").await.unwrap_err();
    assert!(err.is_transport(), "unexpected error: {err:?}");
}
