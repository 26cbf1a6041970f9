use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use unigenai::types::{Content, GenerateContentConfig};
use unigenai::{Backend, Client, ClientConfig, Error, HttpOptions, StaticTokenProvider};

fn gemini_client(base_url: &str) -> Client {
    Client::new(ClientConfig {
        api_key: Some("test-key".into()),
        http_options: HttpOptions {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
}

fn vertex_client(base_url: &str) -> Client {
    Client::new(ClientConfig {
        project: Some("test-project".into()),
        location: Some("us-central1".into()),
        credentials: Some(Arc::new(StaticTokenProvider("test-token".into()))),
        http_options: HttpOptions {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn unary_generate_sends_wire_shape_and_decodes_reply() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
        .match_header("x-goog-api-key", "test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}],
            "generationConfig": {"temperature": 0.5},
            "systemInstruction": {"parts": [{"text": "be brief"}]}
        })))
        .with_status(200)
        .with_body(
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Hi there"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 2, "totalTokenCount": 5}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let config = GenerateContentConfig {
        temperature: Some(0.5),
        system_instruction: Some(Content {
            role: None,
            parts: vec![unigenai::types::Part::text("be brief")],
        }),
        ..Default::default()
    };
    let response = client
        .models()
        .generate_content("gemini-2.0-flash", vec![Content::user_text("Hello")], Some(config))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.text(), "Hi there");
    assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(5));
}

#[tokio::test]
async fn vertex_path_is_project_scoped_with_bearer_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock(
            "POST",
            "/v1beta1/projects/test-project/locations/us-central1/publishers/google/models/gemini-2.0-flash:generateContent",
        )
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(json!({"candidates": []}).to_string())
        .create_async()
        .await;

    let client = vertex_client(&server.url());
    client
        .models()
        .generate_content("gemini-2.0-flash", vec![Content::user_text("Hello")], None)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn error_envelope_becomes_client_fault() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", Matcher::Any)
        .with_status(400)
        .with_body(
            json!({"error": {
                "code": 400,
                "message": "invalid argument",
                "status": "INVALID_ARGUMENT"
            }})
            .to_string(),
        )
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let err = client
        .models()
        .generate_content("m", vec![Content::user_text("x")], None)
        .await
        .unwrap_err();
    match err {
        Error::ClientFault(api) => {
            assert_eq!(api.code, 400);
            assert_eq!(api.message, "invalid argument");
            assert_eq!(api.status, "INVALID_ARGUMENT");
        }
        other => panic!("expected ClientFault, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_error_body_is_synthesized() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", Matcher::Any)
        .with_status(500)
        .with_body("backend exploded")
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let err = client
        .models()
        .generate_content("m", vec![Content::user_text("x")], None)
        .await
        .unwrap_err();
    match err {
        Error::ServerFault(api) => {
            assert_eq!(api.code, 500);
            assert_eq!(api.message, "backend exploded");
            assert_eq!(api.status, "500 Internal Server Error");
        }
        other => panic!("expected ServerFault, got {other:?}"),
    }
}

#[tokio::test]
async fn streaming_yields_each_record() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
        "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"lo\"}]}}]}\n\n",
    );
    let mock = server
        .mock("POST", "/v1beta/models/m:streamGenerateContent")
        .match_query(Matcher::UrlEncoded("alt".into(), "sse".into()))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let stream = client
        .models()
        .generate_content_stream("m", vec![Content::user_text("Hello")], None)
        .await
        .unwrap();
    let chunks: Vec<String> = stream.map(|r| r.unwrap().text()).collect().await;
    mock.assert_async().await;
    assert_eq!(chunks, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn streaming_error_status_classified_before_any_record() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", Matcher::Any)
        .with_status(429)
        .with_body(json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}).to_string())
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let result = client
        .models()
        .generate_content_stream("m", vec![Content::user_text("x")], None)
        .await;
    match result {
        Err(Error::ClientFault(api)) => assert_eq!(api.status, "RESOURCE_EXHAUSTED"),
        Err(other) => panic!("expected ClientFault, got {other:?}"),
        Ok(_) => panic!("expected the stream request to fail"),
    }
}

#[tokio::test]
async fn compute_tokens_rejected_on_gemini() {
    let client = gemini_client("http://localhost:1");
    let err = client
        .models()
        .compute_tokens("m", vec![Content::user_text("x")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(client.backend(), Backend::GeminiApi);
}

#[tokio::test]
async fn chat_replays_history_and_records_sanitized_reply() {
    let mut server = mockito::Server::new_async().await;
    // First exchange.
    server
        .mock("POST", "/v1beta/models/m:generateContent")
        .match_body(Matcher::Json(json!({
            "contents": [{"role": "user", "parts": [{"text": "first"}]}]
        })))
        .with_status(200)
        .with_body(
            json!({"candidates": [{"content": {"parts": [{"text": "reply"}, {"text": ""}]}}]})
                .to_string(),
        )
        .create_async()
        .await;
    // Second exchange carries the prior turns, empty text part dropped and
    // model role forced.
    let second = server
        .mock("POST", "/v1beta/models/m:generateContent")
        .match_body(Matcher::Json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "first"}]},
                {"role": "model", "parts": [{"text": "reply"}]},
                {"role": "user", "parts": [{"text": "second"}]}
            ]
        })))
        .with_status(200)
        .with_body(json!({"candidates": [{"content": {"parts": [{"text": "done"}]}}]}).to_string())
        .create_async()
        .await;

    let client = gemini_client(&server.url());
    let mut chat = client.chats().create("m", None, Vec::new());
    chat.send_message(vec![unigenai::types::Part::text("first")])
        .await
        .unwrap();
    let response = chat
        .send_message(vec![unigenai::types::Part::text("second")])
        .await
        .unwrap();
    second.assert_async().await;
    assert_eq!(response.text(), "done");
    assert_eq!(chat.history().len(), 4);
}
