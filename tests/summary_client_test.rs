//! Integration tests for the AI summary client against a mocked completions API.

use jira_update::config::OpenAiConfig;
use jira_update::error::SummaryError;
use jira_update::llm::{OpenAiClient, SummaryProvider};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_client(server: &MockServer) -> OpenAiClient {
    let config = OpenAiConfig {
        base_url: format!("{}/v1", server.uri()),
        model: "test-model".to_string(),
        ..Default::default()
    };
    OpenAiClient::new(&config, "sk-test".to_string()).expect("Failed to build client")
}

#[tokio::test]
async fn test_completion_text_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "max_tokens": 300
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "  Adds retry to the client.\n" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = mock_client(&server).complete("Summarize").await.unwrap();
    assert_eq!(text, "Adds retry to the client.");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server).complete("Summarize").await.unwrap_err();
    match err {
        SummaryError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = mock_client(&server).complete("Summarize").await.unwrap_err();
    assert!(matches!(err, SummaryError::EmptyResponse));
}
