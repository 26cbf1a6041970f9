//! Converters for the Gemini Developer API wire shape.

use super::{copy_converted, copy_converted_slice, copy_field, expect_object};
use crate::config::ResolvedConfig;
use crate::utils::{get_value_by_path, set_value_by_path};
use crate::Result;
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
    copy_field(from, &mut to, &["id"], &["id"]);
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
    let mut to = new_map();
    copy_field(from, &mut to, &["id"], &["id"]);
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
    // Schema is already wire-shaped; both deployments accept it verbatim.
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

/// Generation parameters land in the converter's own output map (the
/// request's `generationConfig` node) while prompt-level companions
/// (system instruction, tools, safety settings) are hoisted into the parent
/// request node.
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
    copy_field(from, &mut to, &["id"], &["id"]);
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
    Ok(to)
}

/// This deployment names the citation list `citationSources`.
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
        &["citationSources"],
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

// --- files ---

pub fn file_from_wire(_cfg: &ResolvedConfig, from: &Value, _parent: &mut Value) -> Result<Value> {
    expect_object(from, "File")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["name"], &["name"]);
    copy_field(from, &mut to, &["displayName"], &["displayName"]);
    copy_field(from, &mut to, &["mimeType"], &["mimeType"]);
    copy_field(from, &mut to, &["sizeBytes"], &["sizeBytes"]);
    copy_field(from, &mut to, &["uri"], &["uri"]);
    copy_field(from, &mut to, &["downloadUri"], &["downloadUri"]);
    copy_field(from, &mut to, &["state"], &["state"]);
    Ok(to)
}

pub fn list_files_response_from_wire(
    cfg: &ResolvedConfig,
    from: &Value,
    _parent: &mut Value,
) -> Result<Value> {
    expect_object(from, "ListFilesResponse")?;
    let mut to = new_map();
    copy_field(from, &mut to, &["nextPageToken"], &["nextPageToken"]);
    copy_converted_slice(cfg, from, &mut to, &["files"], &["files"], file_from_wire)?;
    Ok(to)
}

// --- realtime session ---

/// Generation parameters are hoisted into the enclosing setup frame under
/// `generationConfig`; the converter's own output stays empty.
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
    use serde_json::json;

    #[test]
    fn request_hoists_prompt_companions_out_of_generation_config() {
        let cfg = test_config(Backend::GeminiApi);
        let from = json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "config": {
                "temperature": 0.5,
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "safetySettings": [{"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"}]
            }
        });
        let mut parent = json!({});
        let to = generate_content_request_to_wire(&cfg, &from, &mut parent).unwrap();
        assert_eq!(
            to,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
                "generationConfig": {"temperature": 0.5},
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "safetySettings": [{"category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_NONE"}]
            })
        );
    }

    #[test]
    fn function_response_id_is_kept() {
        let cfg = test_config(Backend::GeminiApi);
        let mut parent = json!({});
        let to = function_response_to_wire(
            &cfg,
            &json!({"id": "call-1", "name": "f", "response": {"ok": true}}),
            &mut parent,
        )
        .unwrap();
        assert_eq!(to, json!({"id": "call-1", "name": "f", "response": {"ok": true}}));
    }

    #[test]
    fn citation_sources_key_renamed_on_decode() {
        let cfg = test_config(Backend::GeminiApi);
        let mut parent = json!({});
        let to = citation_metadata_from_wire(
            &cfg,
            &json!({"citationSources": [{"uri": "https://example.com", "startIndex": 1}]}),
            &mut parent,
        )
        .unwrap();
        assert_eq!(
            to,
            json!({"citations": [{"uri": "https://example.com", "startIndex": 1}]})
        );
    }

    #[test]
    fn connect_config_fields_land_in_setup_generation_config() {
        let cfg = test_config(Backend::GeminiApi);
        let from = json!({
            "model": "models/gemini-2.0-flash",
            "config": {
                "responseModalities": ["TEXT"],
                "temperature": 0.7,
                "systemInstruction": {"parts": [{"text": "short answers"}]}
            }
        });
        let mut parent = json!({});
        let to = live_connect_parameters_to_wire(&cfg, &from, &mut parent).unwrap();
        assert_eq!(
            to,
            json!({
                "setup": {
                    "model": "models/gemini-2.0-flash",
                    "generationConfig": {"responseModalities": ["TEXT"], "temperature": 0.7},
                    "systemInstruction": {"parts": [{"text": "short answers"}]}
                }
            })
        );
    }

    #[test]
    fn content_survives_wire_round_trip() {
        let cfg = test_config(Backend::GeminiApi);
        let content = json!({
            "role": "user",
            "parts": [
                {"text": "look at this"},
                {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}},
                {"fileData": {"mimeType": "video/mp4", "fileUri": "files/clip"}},
                {"functionCall": {"id": "call-1", "name": "f", "args": {"x": 1}}},
                {"functionResponse": {"id": "call-1", "name": "f", "response": {"ok": true}}}
            ]
        });
        let mut parent = json!({});
        let wire = content_to_wire(&cfg, &content, &mut parent).unwrap();
        let back = content_from_wire(&cfg, &wire, &mut parent).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn empty_optional_subtrees_stay_absent() {
        let cfg = test_config(Backend::GeminiApi);
        let mut parent = json!({});
        let to = generate_content_request_to_wire(
            &cfg,
            &json!({"contents": [{"parts": [{"text": "hi"}]}], "config": {}}),
            &mut parent,
        )
        .unwrap();
        assert_eq!(to, json!({"contents": [{"parts": [{"text": "hi"}]}]}));
    }
}
