//! Unified error type for the client library.
//!
//! This aggregates transport failures, backend error envelopes, converter
//! failures, and typed-bridge decode failures into actionable categories.
//! Every failure propagates synchronously to the caller of the failing
//! operation; nothing is swallowed or logged-and-continued inside the core.

use serde::Deserialize;
use thiserror::Error;

/// Parsed backend error envelope, returned with HTTP status >= 400.
///
/// When the response body does not carry a parseable envelope, one is
/// synthesized with the raw body text as the message and the HTTP status
/// phrase as the status string.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiError {
    /// Numeric error code, usually matching the HTTP status.
    #[serde(default)]
    pub code: u16,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Machine-readable status string (e.g. "INVALID_ARGUMENT").
    #[serde(default)]
    pub status: String,
    /// Structured detail objects, passed through verbatim.
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Error {}, Message: {}, Status: {}, Details: {:?}",
            self.code, self.message, self.status, self.details
        )
    }
}

/// Unified error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection/DNS/TLS level failure. Terminal; never retried internally.
    #[error("transport error while {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP 4xx response. The request as formed will not succeed on retry.
    #[error("client error: {0}")]
    ClientFault(ApiError),

    /// HTTP 5xx response. Callers decide their own retry policy.
    #[error("server error: {0}")]
    ServerFault(ApiError),

    /// Response claimed success but the body (or a streaming record) violated
    /// the wire format contract.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Structural conversion failure: a field unsupported by the active
    /// backend, or an unexpected node shape in the source tree.
    #[error("conversion error: {0}")]
    Convert(String),

    /// Typed-bridge decode hook failure (bad numeric string, date without a
    /// year, undecodable byte blob). The reason carries the offending field's
    /// raw value.
    #[error("cannot decode {type_name}: {reason}")]
    Decode { type_name: String, reason: String },

    /// Invalid or ambiguous client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Realtime session lifecycle misuse or socket failure.
    #[error("session error: {0}")]
    Session(String),

    /// The caller-supplied cancellation token fired mid-call.
    #[error("operation cancelled while {0}")]
    Cancelled(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a transport-layer failure with context about which call failed.
    pub(crate) fn transport(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Classify an HTTP status + (possibly unparseable) body into a fault.
    ///
    /// The 4xx/5xx split lets callers pick a retry policy; this layer itself
    /// never retries.
    pub(crate) fn classify(status: u16, reason: Option<&str>, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: ApiError,
        }

        let api_error = match serde_json::from_str::<Envelope>(body) {
            Ok(env) if env.error.code != 0 || !env.error.message.is_empty() => env.error,
            _ => ApiError {
                code: status,
                message: body.trim_end_matches('\n').to_string(),
                status: format!("{} {}", status, reason.unwrap_or("")).trim_end().to_string(),
                details: Vec::new(),
            },
        };

        if status >= 500 {
            Error::ServerFault(api_error)
        } else {
            Error::ClientFault(api_error)
        }
    }
}
