//! Content generation and token accounting calls.

use crate::config::Backend;
use crate::convert::{mldev, vertex};
use crate::transport::{ApiRequest, Transport};
use crate::types::{
    deep_marshal, map_to_struct, ComputeTokensResponse, Content, CountTokensResponse,
    GenerateContentConfig, GenerateContentResponse,
};
use crate::{BoxStream, Error, Result};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;

/// Model calls, obtained from [`crate::Client::models`].
pub struct Models {
    transport: Arc<Transport>,
}

impl Models {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Models { transport }
    }

    fn build_generate_body(
        &self,
        contents: &[Content],
        config: Option<&GenerateContentConfig>,
    ) -> Result<serde_json::Value> {
        let cfg = self.transport.config();
        let mut params = json!({ "contents": deep_marshal(&contents)? });
        if let Some(config) = config {
            params["config"] = deep_marshal(config)?;
        }
        let to_wire = match cfg.backend {
            Backend::GeminiApi => mldev::generate_content_request_to_wire,
            Backend::VertexAi => vertex::generate_content_request_to_wire,
        };
        let mut parent = json!({});
        to_wire(cfg, &params, &mut parent)
    }

    /// Single-shot generation.
    pub async fn generate_content(
        &self,
        model: &str,
        contents: Vec<Content>,
        config: Option<GenerateContentConfig>,
    ) -> Result<GenerateContentResponse> {
        let cfg = self.transport.config();
        let body = self.build_generate_body(&contents, config.as_ref())?;
        let path = format!("{}:generateContent", cfg.model_full_name(model));
        let raw = self.transport.request_json(ApiRequest::post(path, body)).await?;

        let from_wire = match cfg.backend {
            Backend::GeminiApi => mldev::generate_content_response_from_wire,
            Backend::VertexAi => vertex::generate_content_response_from_wire,
        };
        let mut parent = json!({});
        map_to_struct(from_wire(cfg, &raw, &mut parent)?)
    }

    /// Streaming generation: each server-sent record becomes one response
    /// value. The stream is lazy and may be dropped early.
    pub async fn generate_content_stream(
        &self,
        model: &str,
        contents: Vec<Content>,
        config: Option<GenerateContentConfig>,
    ) -> Result<BoxStream<'static, GenerateContentResponse>> {
        let cfg = self.transport.config();
        let body = self.build_generate_body(&contents, config.as_ref())?;
        let path = format!("{}:streamGenerateContent", cfg.model_full_name(model));
        let request = ApiRequest::post(path, body).query("alt", "sse");

        let from_wire = match cfg.backend {
            Backend::GeminiApi => mldev::generate_content_response_from_wire,
            Backend::VertexAi => vertex::generate_content_response_from_wire,
        };
        let cfg = Arc::new(cfg.clone());
        let records = self.transport.request_stream(request).await?;
        let typed = records.map(move |record| {
            let raw = record?;
            let mut parent = json!({});
            map_to_struct(from_wire(&cfg, &raw, &mut parent)?)
        });
        Ok(Box::pin(typed))
    }

    /// Count the tokens a prompt would consume.
    pub async fn count_tokens(
        &self,
        model: &str,
        contents: Vec<Content>,
    ) -> Result<CountTokensResponse> {
        let cfg = self.transport.config();
        let to_wire = match cfg.backend {
            Backend::GeminiApi => mldev::count_tokens_request_to_wire,
            Backend::VertexAi => vertex::count_tokens_request_to_wire,
        };
        let mut parent = json!({});
        let body = to_wire(cfg, &json!({ "contents": deep_marshal(&contents)? }), &mut parent)?;
        let path = format!("{}:countTokens", cfg.model_full_name(model));
        let raw = self.transport.request_json(ApiRequest::post(path, body)).await?;

        let from_wire = match cfg.backend {
            Backend::GeminiApi => mldev::count_tokens_response_from_wire,
            Backend::VertexAi => vertex::count_tokens_response_from_wire,
        };
        let mut parent = json!({});
        map_to_struct(from_wire(cfg, &raw, &mut parent)?)
    }

    /// Tokenize a prompt, returning token ids and bytes. Vertex AI only.
    pub async fn compute_tokens(
        &self,
        model: &str,
        contents: Vec<Content>,
    ) -> Result<ComputeTokensResponse> {
        let cfg = self.transport.config();
        if cfg.backend != Backend::VertexAi {
            return Err(Error::Config(
                "compute_tokens is only supported on the Vertex AI backend".to_string(),
            ));
        }
        let mut parent = json!({});
        let body = vertex::compute_tokens_request_to_wire(
            cfg,
            &json!({ "contents": deep_marshal(&contents)? }),
            &mut parent,
        )?;
        let path = format!("{}:computeTokens", cfg.model_full_name(model));
        let raw = self.transport.request_json(ApiRequest::post(path, body)).await?;
        let mut parent = json!({});
        map_to_struct(vertex::compute_tokens_response_from_wire(cfg, &raw, &mut parent)?)
    }
}
