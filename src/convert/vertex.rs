//! Converters for the Vertex AI wire shape.
//!
//! Mostly parallel to [`super::mldev`]; the deviations are the fields this
//! deployment does not accept (`FunctionResponse.id`), the citation list key
//! (`citations` rather than `citationSources`), and citation publication
//! dates, which only exist here.

use super::{copy_converted, copy_converted_slice, copy_field, expect_object};
use crate::config::ResolvedConfig;
use crate::utils::{get_value_by_path, set_value_by_path};
use crate::{Error, Result};
use serde_json::{Map, Value};

fn new_map() -> Value {
    Value::Object(Map::new())
}

pub fn blob_to_wire(_cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Blob")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["mimeType"], &["mimeType"]);
    copy_field(from, &mut to, &["data"], &["data"]);
    Ok(to)
}

pub fn file_data_to_wire(_cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "FileData")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["mimeType"], &["mimeType"]);
    copy_field(from, &mut to, &["fileUri"], &["fileUri"]);
    Ok(to)
}

pub fn function_call_to_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "FunctionCall")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["name"], &["name"]);
    copy_field(from, &mut to, &["args"], &["args"]);
    Ok(to)
}

pub fn function_response_to_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "FunctionResponse")?;
    if get_value_by_path(from, &["id"]).is_some() {
        return Err(Error::Convert(
            "the FunctionResponse \"id\" field is not supported by Vertex AI".to_string(),
        ));
    }
    let mut to = new_map();
    copy_field(from, &mut to, &["name"], &["name"]);
    copy_field(from, &mut to, &["response"], &["response"]);
    Ok(to)
}

pub fn part_to_wire(cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Part")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["text"], &["text"]);
    copy_converted(cfg, from, &mut to, &["inlineData"], &["inlineData"], blob_to_wire)?;
    copy_converted(cfg, from, &mut to, &["fileData"], &["fileData"], file_data_to_wire)?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["functionCall"],
        &["functionCall"],
        function_call_to_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["functionResponse"],
        &["functionResponse"],
        function_response_to_wire,
    )?;
    Ok(to)
}

pub fn content_to_wire(cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Content")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["parts"], &["parts"], part_to_wire)?;
    copy_field(from, &mut to, &["role"], &["role"]);
    Ok(to)
}

pub fn schema_to_wire(_cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Schema")?;
    Ok(from.clone())
}

pub fn function_declaration_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "FunctionDeclaration")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["name"], &["name"]);
    copy_field(from, &mut to, &["description"], &["description"]);
    copy_converted(cfg, from, &mut to, &["parameters"], &["parameters"], schema_to_wire)?;
    Ok(to)
}

pub fn tool_to_wire(cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Tool")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["functionDeclarations"],
        &["functionDeclarations"],
        function_declaration_to_wire,
    )?;
    Ok(to)
}

pub fn safety_setting_to_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "SafetySetting")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["category"], &["category"]);
    copy_field(from, &mut to, &["threshold"], &["threshold"]);
    Ok(to)
}

pub fn generate_content_config_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "GenerateContentConfig")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["temperature"], &["temperature"]);
    copy_field(from, &mut to, &["topP"], &["topP"]);
    copy_field(from, &mut to, &["topK"], &["topK"]);
    copy_field(from, &mut to, &["candidateCount"], &["candidateCount"]);
    copy_field(from, &mut to, &["maxOutputTokens"], &["maxOutputTokens"]);
    copy_field(from, &mut to, &["stopSequences"], &["stopSequences"]);
    copy_field(from, &mut to, &["seed"], &["seed"]);
    copy_field(from, &mut to, &["responseMimeType"], &["responseMimeType"]);
    copy_converted(
        cfg,
        from,
        &mut to,
        &["responseSchema"],
        &["responseSchema"],
        schema_to_wire,
    )?;

    copy_converted(
        cfg,
        from,
        parent,
        &["systemInstruction"],
        &["systemInstruction"],
        content_to_wire,
    )?;
    copy_converted_slice(cfg, from, parent, &["tools"], &["tools"], tool_to_wire)?;
    copy_converted_slice(
        cfg,
        from,
        parent,
        &["safetySettings"],
        &["safetySettings"],
        safety_setting_to_wire,
    )?;
    Ok(to)
}

pub fn generate_content_request_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "GenerateContentParameters")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["contents"], &["contents"], content_to_wire)?;
    if let Some(config) = get_value_by_path(from, &["config"]) {
        let generation_config = generate_content_config_to_wire(cfg, &config, &mut to)?;
        set_value_by_path(&mut to, &["generationConfig"], &generation_config);
    }
    Ok(to)
}

// --- responses ---

pub fn function_call_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "FunctionCall")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["name"], &["name"]);
    copy_field(from, &mut to, &["args"], &["args"]);
    Ok(to)
}

pub fn part_from_wire(cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Part")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["text"], &["text"]);
    copy_field(from, &mut to, &["inlineData"], &["inlineData"]);
    copy_field(from, &mut to, &["fileData"], &["fileData"]);
    copy_converted(
        cfg,
        from,
        &mut to,
        &["functionCall"],
        &["functionCall"],
        function_call_from_wire,
    )?;
    copy_field(from, &mut to, &["functionResponse"], &["functionResponse"]);
    Ok(to)
}

pub fn content_from_wire(cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "Content")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["parts"], &["parts"], part_from_wire)?;
    copy_field(from, &mut to, &["role"], &["role"]);
    Ok(to)
}

pub fn citation_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "Citation")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["startIndex"], &["startIndex"]);
    copy_field(from, &mut to, &["endIndex"], &["endIndex"]);
    copy_field(from, &mut to, &["uri"], &["uri"]);
    copy_field(from, &mut to, &["title"], &["title"]);
    copy_field(from, &mut to, &["license"], &["license"]);
    copy_field(from, &mut to, &["publicationDate"], &["publicationDate"]);
    Ok(to)
}

pub fn citation_metadata_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "CitationMetadata")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["citations"],
        &["citations"],
        citation_from_wire,
    )?;
    Ok(to)
}

pub fn candidate_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "Candidate")?;
    let mut to = new_map();
    copy_converted(cfg, from, &mut to, &["content"], &["content"], content_from_wire)?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["citationMetadata"],
        &["citationMetadata"],
        citation_metadata_from_wire,
    )?;
    copy_field(from, &mut to, &["finishReason"], &["finishReason"]);
    copy_field(from, &mut to, &["index"], &["index"]);
    copy_field(from, &mut to, &["safetyRatings"], &["safetyRatings"]);
    Ok(to)
}

pub fn usage_metadata_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "UsageMetadata")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["promptTokenCount"], &["promptTokenCount"]);
    copy_field(from, &mut to, &["candidatesTokenCount"], &["candidatesTokenCount"]);
    copy_field(from, &mut to, &["totalTokenCount"], &["totalTokenCount"]);
    Ok(to)
}

pub fn generate_content_response_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "GenerateContentResponse")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["candidates"],
        &["candidates"],
        candidate_from_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["usageMetadata"],
        &["usageMetadata"],
        usage_metadata_from_wire,
    )?;
    copy_field(from, &mut to, &["modelVersion"], &["modelVersion"]);
    Ok(to)
}

pub fn count_tokens_request_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "CountTokensParameters")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["contents"], &["contents"], content_to_wire)?;
    Ok(to)
}

pub fn count_tokens_response_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "CountTokensResponse")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["totalTokens"], &["totalTokens"]);
    Ok(to)
}

pub fn compute_tokens_request_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "ComputeTokensParameters")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["contents"], &["contents"], content_to_wire)?;
    Ok(to)
}

/// Token ids and bytes pass through verbatim; the typed bridge applies the
/// decimal-string and base64 decodings.
pub fn compute_tokens_response_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "ComputeTokensResponse")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["tokensInfo"], &["tokensInfo"]);
    Ok(to)
}

// --- realtime session ---

pub fn live_connect_config_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveConnectConfig")?;
    copy_field(
        from,
        parent,
        &["responseModalities"],
        &["setup", "generationConfig", "responseModalities"],
    );
    copy_field(from, parent, &["temperature"], &["setup", "generationConfig", "temperature"]);
    copy_field(from, parent, &["topP"], &["setup", "generationConfig", "topP"]);
    copy_field(from, parent, &["topK"], &["setup", "generationConfig", "topK"]);
    copy_field(
        from,
        parent,
        &["maxOutputTokens"],
        &["setup", "generationConfig", "maxOutputTokens"],
    );
    copy_field(from, parent, &["seed"], &["setup", "generationConfig", "seed"]);
    copy_converted(
        cfg,
        from,
        parent,
        &["systemInstruction"],
        &["setup", "systemInstruction"],
        content_to_wire,
    )?;
    copy_converted_slice(cfg, from, parent, &["tools"], &["setup", "tools"], tool_to_wire)?;
    Ok(new_map())
}

pub fn live_connect_parameters_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveConnectParameters")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["model"], &["setup", "model"]);
    if let Some(config) = get_value_by_path(from, &["config"]) {
        live_connect_config_to_wire(cfg, &config, &mut to)?;
    }
    Ok(to)
}

pub fn live_client_content_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveClientContent")?;
    let mut to = new_map();
    copy_converted_slice(cfg, from, &mut to, &["turns"], &["turns"], content_to_wire)?;
    copy_field(from, &mut to, &["turnComplete"], &["turnComplete"]);
    Ok(to)
}

pub fn live_client_realtime_input_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveClientRealtimeInput")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["mediaChunks"],
        &["mediaChunks"],
        blob_to_wire,
    )?;
    Ok(to)
}

pub fn live_client_tool_response_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveClientToolResponse")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["functionResponses"],
        &["functionResponses"],
        function_response_to_wire,
    )?;
    Ok(to)
}

pub fn live_client_message_to_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveClientMessage")?;
    let mut to = new_map();
    copy_converted(
        cfg,
        from,
        &mut to,
        &["clientContent"],
        &["clientContent"],
        live_client_content_to_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["realtimeInput"],
        &["realtimeInput"],
        live_client_realtime_input_to_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["toolResponse"],
        &["toolResponse"],
        live_client_tool_response_to_wire,
    )?;
    Ok(to)
}

pub fn live_server_content_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveServerContent")?;
    let mut to = new_map();
    copy_converted(cfg, from, &mut to, &["modelTurn"], &["modelTurn"], content_from_wire)?;
    copy_field(from, &mut to, &["turnComplete"], &["turnComplete"]);
    copy_field(from, &mut to, &["interrupted"], &["interrupted"]);
    Ok(to)
}

pub fn live_server_tool_call_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveServerToolCall")?;
    let mut to = new_map();
    copy_converted_slice(
        cfg,
        from,
        &mut to,
        &["functionCalls"],
        &["functionCalls"],
        function_call_from_wire,
    )?;
    Ok(to)
}

pub fn live_server_tool_call_cancellation_from_wire(
    _cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveServerToolCallCancellation")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["ids"], &["ids"]);
    Ok(to)
}

pub fn live_server_message_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "LiveServerMessage")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["setupComplete"], &["setupComplete"]);
    copy_converted(
        cfg,
        from,
        &mut to,
        &["serverContent"],
        &["serverContent"],
        live_server_content_from_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["toolCall"],
        &["toolCall"],
        live_server_tool_call_from_wire,
    )?;
    copy_converted(
        cfg,
        from,
        &mut to,
        &["toolCallCancellation"],
        &["toolCallCancellation"],
        live_server_tool_call_cancellation_from_wire,
    )?;
    Ok(to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::convert::test_config;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn function_response_id_is_rejected() {
        let cfg = test_config(Backend::VertexAi);
        let mut parent = json!({});
        let err = function_response_to_wire(
            &cfg,
            &json!({"id": "call-1", "name": "f", "response": {}}),
            &mut parent,
        )
        .unwrap_err();
        match err {
            Error::Convert(msg) => {
                assert!(msg.contains("id"), "message should name the field: {msg}");
                assert!(msg.contains("Vertex"), "message should name the backend: {msg}");
            }
            other => panic!("expected Convert, got {other:?}"),
        }
    }

    #[test]
    fn function_response_id_rejected_through_full_request() {
        let cfg = test_config(Backend::VertexAi);
        let from = json!({
            "contents": [{
                "role": "user",
                "parts": [{"functionResponse": {"id": "x", "name": "f", "response": {}}}]
            }]
        });
        let mut parent = json!({});
        assert!(generate_content_request_to_wire(&cfg, &from, &mut parent).is_err());
    }

    #[test]
    fn citation_list_uses_citations_key() {
        let cfg = test_config(Backend::VertexAi);
        let mut parent = json!({});
        let to = citation_metadata_from_wire(
            &cfg,
            &json!({"citations": [{
                "uri": "https://example.com",
                "publicationDate": {"year": 2023, "month": 10}
            }]}),
            &mut parent,
        )
        .unwrap();
        assert_eq!(
            to,
            json!({"citations": [{
                "uri": "https://example.com",
                "publicationDate": {"year": 2023, "month": 10}
            }]})
        );
    }

    #[test]
    fn content_survives_wire_round_trip() {
        let cfg = test_config(Backend::VertexAi);
        // No call/response ids: this deployment does not carry them.
        let content = json!({
            "role": "user",
            "parts": [
                {"text": "look at this"},
                {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}},
                {"fileData": {"mimeType": "video/mp4", "fileUri": "gs://bucket/clip"}},
                {"functionCall": {"name": "f", "args": {"x": 1}}},
                {"functionResponse": {"name": "f", "response": {"ok": true}}}
            ]
        });
        let mut parent = json!({});
        let wire = content_to_wire(&cfg, &content, &mut parent).unwrap();
        let back = content_from_wire(&cfg, &wire, &mut parent).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn source_node_is_never_mutated() {
        let cfg = test_config(Backend::VertexAi);
        let from = json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "config": {"temperature": 0.5}
        });
        let before = from.clone();
        let mut parent = json!({});
        generate_content_request_to_wire(&cfg, &from, &mut parent).unwrap();
        assert_eq!(from, before);
    }
}
