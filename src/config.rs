//! Client configuration and backend resolution.
//!
//! Configuration is resolved exactly once, at [`crate::Client`] construction:
//! explicit fields win, then the caller-provided [`EnvConfig`] snapshot, then
//! backend-specific defaults. The resolved form is immutable for the lifetime
//! of the client; no process-wide mutable state exists.

use crate::{Error, Result};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Deployment selector, fixed at client construction.
///
/// Both values are deployments of the same conceptual service; they differ in
/// authentication, URL shape, and wire field layout. Only converter dispatch
/// and URL/auth building ever branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The Gemini Developer API (API-key auth).
    GeminiApi,
    /// Vertex AI (project/location plus credential-based auth).
    VertexAi,
}

impl Backend {
    pub(crate) fn default_base_url(self, location: Option<&str>) -> String {
        match self {
            Backend::GeminiApi => "https://generativelanguage.googleapis.com".to_string(),
            Backend::VertexAi => format!(
                "https://{}-aiplatform.googleapis.com",
                location.unwrap_or("us-central1")
            ),
        }
    }

    pub(crate) fn default_api_version(self) -> &'static str {
        match self {
            Backend::GeminiApi => "v1beta",
            Backend::VertexAi => "v1beta1",
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Backend::GeminiApi => "Gemini API",
            Backend::VertexAi => "Vertex AI",
        }
    }
}

/// Capability consumed by the core for credential-based auth.
///
/// The refresh mechanism itself lives outside this crate; the transport only
/// ever asks for a currently-valid bearer token.
#[async_trait::async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Static token provider, mainly useful in tests and short-lived tools.
pub struct StaticTokenProvider(pub String);

#[async_trait::async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Environment snapshot handed to the client by the (external) configuration
/// loader. The core never reads process environment variables directly.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub backend: Option<Backend>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Per-call or per-client HTTP overrides.
#[derive(Clone, Default)]
pub struct HttpOptions {
    /// Base URL override (scheme + host, no trailing slash required).
    pub base_url: Option<String>,
    /// API version path segment, e.g. "v1beta".
    pub api_version: Option<String>,
    /// Extra headers; these take precedence over the SDK defaults.
    pub headers: HeaderMap,
}

impl std::fmt::Debug for HttpOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpOptions")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("headers", &self.headers.len())
            .finish()
    }
}

/// User-facing configuration for [`crate::Client::new`].
#[derive(Clone, Default)]
pub struct ClientConfig {
    /// Explicit backend selection. When absent, inferred: project/location
    /// imply Vertex AI, an API key implies the Gemini API.
    pub backend: Option<Backend>,
    pub project: Option<String>,
    pub location: Option<String>,
    pub api_key: Option<String>,
    /// Credential capability for Vertex AI bearer-token auth.
    pub credentials: Option<Arc<dyn AccessTokenProvider>>,
    /// Resolved environment snapshot used as a fallback layer.
    pub env: EnvConfig,
    pub http_options: HttpOptions,
    /// Cooperative cancellation for every blocking network call.
    pub cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("backend", &self.backend)
            .field("project", &self.project)
            .field("location", &self.location)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("has_credentials", &self.credentials.is_some())
            .field("http_options", &self.http_options)
            .finish()
    }
}

/// Immutable, validated configuration owned by the client.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub backend: Backend,
    pub project: Option<String>,
    pub location: Option<String>,
    pub api_key: Option<String>,
    pub credentials: Option<Arc<dyn AccessTokenProvider>>,
    pub base_url: String,
    pub api_version: String,
    pub headers: HeaderMap,
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("backend", &self.backend)
            .field("project", &self.project)
            .field("location", &self.location)
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ClientConfig {
    /// Resolve explicit fields, environment fallbacks, and defaults into the
    /// immutable configuration the client carries. Fails when the backend
    /// cannot be chosen unambiguously or required auth material is missing.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let project = self.project.or(self.env.project);
        let location = self.location.or(self.env.location);
        let api_key = self.api_key.or(self.env.api_key);

        let backend = match self.backend.or(self.env.backend) {
            Some(b) => b,
            None => {
                if project.is_some() || location.is_some() {
                    Backend::VertexAi
                } else if api_key.is_some() {
                    Backend::GeminiApi
                } else {
                    return Err(Error::Config(
                        "unable to determine backend: set backend explicitly, or provide \
                         project/location for Vertex AI or an API key for the Gemini API"
                            .to_string(),
                    ));
                }
            }
        };

        match backend {
            Backend::GeminiApi => {
                if api_key.is_none() {
                    return Err(Error::Config(
                        "Gemini API backend requires an API key".to_string(),
                    ));
                }
            }
            Backend::VertexAi => {
                let has_project_location = project.is_some() && location.is_some();
                if api_key.is_some() && (project.is_some() || location.is_some()) {
                    return Err(Error::Config(
                        "project/location and API key are mutually exclusive on Vertex AI"
                            .to_string(),
                    ));
                }
                if !has_project_location && api_key.is_none() {
                    return Err(Error::Config(
                        "Vertex AI backend requires project and location (or an API key)"
                            .to_string(),
                    ));
                }
                if has_project_location && self.credentials.is_none() {
                    return Err(Error::Config(
                        "Vertex AI backend with project/location requires credentials".to_string(),
                    ));
                }
            }
        }

        let base_url = self
            .http_options
            .base_url
            .or(self.env.base_url)
            .unwrap_or_else(|| backend.default_base_url(location.as_deref()));
        let api_version = self
            .http_options
            .api_version
            .unwrap_or_else(|| backend.default_api_version().to_string());

        Ok(ResolvedConfig {
            backend,
            project,
            location,
            api_key,
            credentials: self.credentials,
            base_url,
            api_version,
            headers: self.http_options.headers,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

impl ResolvedConfig {
    /// Expand a bare model name into the fully-qualified resource name the
    /// active backend expects.
    pub(crate) fn model_full_name(&self, model: &str) -> String {
        match self.backend {
            Backend::VertexAi => {
                if model.starts_with("projects/") || model.starts_with("publishers/") {
                    model.to_string()
                } else if model.starts_with("models/") {
                    format!(
                        "projects/{}/locations/{}/publishers/google/{}",
                        self.project.as_deref().unwrap_or_default(),
                        self.location.as_deref().unwrap_or_default(),
                        model
                    )
                } else {
                    format!(
                        "projects/{}/locations/{}/publishers/google/models/{}",
                        self.project.as_deref().unwrap_or_default(),
                        self.location.as_deref().unwrap_or_default(),
                        model
                    )
                }
            }
            Backend::GeminiApi => {
                if model.starts_with("models/") || model.starts_with("tunedModels/") {
                    model.to_string()
                } else {
                    format!("models/{}", model)
                }
            }
        }
    }
}
