//! HTTP transport: request building, sending, classification, streaming.
//!
//! Every network call moves through the same four stages: BUILD the URL,
//! headers and body; SEND via `reqwest`; CLASSIFY the status (non-2xx turns
//! into a typed fault carrying the backend error envelope); DESERIALIZE the
//! body, either as one JSON document or as a lazy stream of server-sent-event
//! records. No stage retries; transport failures are terminal and callers own
//! their retry policy.

pub mod stream;
pub mod upload;

use crate::config::{Backend, ResolvedConfig};
use crate::{BoxStream, Error, Result};
use futures::StreamExt;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// SDK identifier sent as both `User-Agent` and `x-goog-api-client`.
static SDK_HEADER_VALUE: Lazy<String> = Lazy::new(|| {
    format!(
        "unigenai/{} {}/{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
});

/// One API call, described independently of the backend.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Resource path relative to the versioned API root. On Vertex AI a
    /// relative path is prefixed with the project/location scope unless it is
    /// already fully qualified or addresses a publisher model.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Wire body. An empty map means the request carries no payload at all.
    pub body: Value,
}

impl ApiRequest {
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        ApiRequest {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        ApiRequest {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Shared HTTP engine, one per client.
pub struct Transport {
    http: reqwest::Client,
    config: Arc<ResolvedConfig>,
}

impl Transport {
    pub fn new(config: Arc<ResolvedConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::transport("constructing HTTP client", e))?;
        Ok(Transport { http, config })
    }

    pub(crate) fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// BUILD: resolve the absolute URL for a request path.
    pub(crate) fn build_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let cfg = &self.config;
        let scoped_path = match cfg.backend {
            Backend::VertexAi
                if !path.starts_with("projects/") && !path.starts_with("publishers/") =>
            {
                format!(
                    "projects/{}/locations/{}/{}",
                    cfg.project.as_deref().unwrap_or_default(),
                    cfg.location.as_deref().unwrap_or_default(),
                    path
                )
            }
            _ => path.to_string(),
        };

        let joined = format!(
            "{}/{}/{}",
            cfg.base_url.trim_end_matches('/'),
            cfg.api_version,
            scoped_path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| Error::Config(format!("invalid request URL {joined:?}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// BUILD: assemble the header set, caller-supplied headers last so they
    /// take precedence over the defaults.
    pub(crate) async fn build_headers(&self) -> Result<HeaderMap> {
        let cfg = &self.config;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let sdk = HeaderValue::from_str(&SDK_HEADER_VALUE)
            .map_err(|e| Error::Config(format!("invalid SDK header value: {e}")))?;
        headers.insert(USER_AGENT, sdk.clone());
        headers.insert("x-goog-api-client", sdk);

        if let Some(key) = &cfg.api_key {
            headers.insert(
                "x-goog-api-key",
                HeaderValue::from_str(key)
                    .map_err(|e| Error::Config(format!("invalid API key header value: {e}")))?,
            );
        } else if let Some(provider) = &cfg.credentials {
            let token = provider.token().await?;
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| Error::Config(format!("invalid bearer token value: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &cfg.headers {
            headers.insert(name, value.clone());
        }
        Ok(headers)
    }

    /// SEND + CLASSIFY: perform the call and turn non-success statuses into
    /// typed faults. The returned response has status < 400.
    async fn send(&self, req: &ApiRequest) -> Result<reqwest::Response> {
        let url = self.build_url(&req.path, &req.query)?;
        let headers = self.build_headers().await?;
        debug!(method = %req.method, url = %url, "sending request");

        let mut builder = self.http.request(req.method.clone(), url).headers(headers);
        let body_is_empty = req.body.as_object().map(|m| m.is_empty()).unwrap_or(false);
        if !body_is_empty {
            builder = builder.json(&req.body);
        }

        let cancel = self.config.cancel.clone();
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!("requesting {}", req.path)));
            }
            result = builder.send() => result
                .map_err(|e| Error::transport(format!("requesting {}", req.path), e))?,
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let reason = status.canonical_reason();
            let body = response
                .text()
                .await
                .map_err(|e| Error::transport("reading error response body", e))?;
            warn!(status = status.as_u16(), path = %req.path, "request failed");
            return Err(Error::classify(status.as_u16(), reason, &body));
        }
        Ok(response)
    }

    /// Unary call: DESERIALIZE the whole body as one JSON document.
    pub async fn request_json(&self, req: ApiRequest) -> Result<Value> {
        let response = self.send(&req).await?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport("reading response body", e))?;
        if text.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::MalformedBody(format!("response is not valid JSON: {e}")))
    }

    /// Streaming call: DESERIALIZE the body as server-sent-event records,
    /// yielded lazily. Cancellation ends the stream between records.
    pub async fn request_stream(&self, req: ApiRequest) -> Result<BoxStream<'static, Value>> {
        let response = self.send(&req).await?;
        let cancel = self.config.cancel.clone();
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::transport("reading response stream", e)))
            .take_until(Box::pin(cancel.cancelled_owned()));
        Ok(stream::decode_sse(Box::pin(bytes)))
    }

    /// Raw download: the body bytes of a non-JSON resource.
    pub async fn request_bytes(&self, req: ApiRequest) -> Result<Vec<u8>> {
        let response = self.send(&req).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::transport("reading download body", e))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::convert::test_config;

    fn transport(backend: Backend) -> Transport {
        Transport::new(Arc::new(test_config(backend))).unwrap()
    }

    #[test]
    fn gemini_url_joins_without_double_slashes() {
        let t = transport(Backend::GeminiApi);
        let url = t
            .build_url("models/gemini-2.0-flash:generateContent", &[])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn vertex_url_gets_project_scope() {
        let t = transport(Backend::VertexAi);
        let url = t.build_url("publishers/google/models/g:generateContent", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://us-central1-aiplatform.googleapis.com/v1beta1/publishers/google/models/g:generateContent"
        );

        let url = t.build_url("cachedContents/abc", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://us-central1-aiplatform.googleapis.com/v1beta1/projects/test-project/locations/us-central1/cachedContents/abc"
        );

        let url = t.build_url("projects/other/locations/x/foo", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://us-central1-aiplatform.googleapis.com/v1beta1/projects/other/locations/x/foo"
        );
    }

    #[test]
    fn query_pairs_are_appended() {
        let t = transport(Backend::GeminiApi);
        let url = t
            .build_url("files", &[("pageSize".into(), "5".into()), ("pageToken".into(), "tok".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/files?pageSize=5&pageToken=tok"
        );
    }

    #[tokio::test]
    async fn api_key_header_set_for_gemini() {
        let t = transport(Backend::GeminiApi);
        let headers = t.build_headers().await.unwrap();
        assert_eq!(headers.get("x-goog-api-key").unwrap(), "test-key");
        assert!(headers.get(AUTHORIZATION).is_none());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers
            .get("x-goog-api-client")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("unigenai/"));
    }

    #[tokio::test]
    async fn bearer_token_set_for_vertex() {
        let t = transport(Backend::VertexAi);
        let headers = t.build_headers().await.unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-token");
        assert!(headers.get("x-goog-api-key").is_none());
    }

    #[tokio::test]
    async fn caller_headers_take_precedence() {
        let mut cfg = test_config(Backend::GeminiApi);
        cfg.headers
            .insert(USER_AGENT, HeaderValue::from_static("custom-agent"));
        let t = Transport::new(Arc::new(cfg)).unwrap();
        let headers = t.build_headers().await.unwrap();
        assert_eq!(headers.get(USER_AGENT).unwrap(), "custom-agent");
    }
}
