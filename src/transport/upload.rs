//! Resumable byte uploads.
//!
//! The upload protocol is two-phase: a start call announces the total size
//! and media type and answers with a session URL, then the bytes travel in
//! fixed-size chunks to that URL. Each chunk states its command (`upload`,
//! with `finalize` appended on the last one) and its exact byte offset;
//! offsets are strictly sequential. The server reports `active` after every
//! intermediate chunk and `final` after the last, anything else is a
//! protocol violation. The finalize response body carries the file resource.

use crate::transport::Transport;
use crate::{Error, Result};
use reqwest::header::{HeaderValue, CONTENT_LENGTH};
use serde_json::Value;
use tracing::debug;

/// Maximum bytes per chunk.
pub const MAX_CHUNK_SIZE: usize = 8 * 1024 * 1024;

const UPLOAD_COMMAND: &str = "X-Goog-Upload-Command";
const UPLOAD_OFFSET: &str = "X-Goog-Upload-Offset";
const UPLOAD_PROTOCOL: &str = "X-Goog-Upload-Protocol";
const UPLOAD_STATUS: &str = "X-Goog-Upload-Status";
const UPLOAD_URL: &str = "X-Goog-Upload-URL";
const UPLOAD_HEADER_CONTENT_LENGTH: &str = "X-Goog-Upload-Header-Content-Length";
const UPLOAD_HEADER_CONTENT_TYPE: &str = "X-Goog-Upload-Header-Content-Type";

/// Open an upload session; returns the session URL for the chunk phase.
pub(crate) async fn start_session(
    transport: &Transport,
    total_size: usize,
    mime_type: Option<&str>,
    metadata: Value,
) -> Result<String> {
    let cfg = transport.config();
    let url = format!(
        "{}/upload/{}/files",
        cfg.base_url.trim_end_matches('/'),
        cfg.api_version
    );

    let mut headers = transport.build_headers().await?;
    headers.insert(UPLOAD_PROTOCOL, HeaderValue::from_static("resumable"));
    headers.insert(UPLOAD_COMMAND, HeaderValue::from_static("start"));
    headers.insert(
        UPLOAD_HEADER_CONTENT_LENGTH,
        HeaderValue::from_str(&total_size.to_string())
            .map_err(|e| Error::Config(format!("invalid upload size header: {e}")))?,
    );
    if let Some(mime) = mime_type {
        headers.insert(
            UPLOAD_HEADER_CONTENT_TYPE,
            HeaderValue::from_str(mime)
                .map_err(|e| Error::Config(format!("invalid MIME type header: {e}")))?,
        );
    }

    let response = transport
        .http()
        .post(&url)
        .headers(headers)
        .json(&metadata)
        .send()
        .await
        .map_err(|e| Error::transport("starting upload session", e))?;

    let status = response.status();
    if status.as_u16() >= 400 {
        let reason = status.canonical_reason();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport("reading upload start error body", e))?;
        return Err(Error::classify(status.as_u16(), reason, &body));
    }

    response
        .headers()
        .get(UPLOAD_URL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::MalformedBody("upload start response is missing the session URL".to_string())
        })
}

/// Send every chunk in order and return the finalize response body.
///
/// `chunk_size` is a parameter so the chunking loop can be exercised with
/// small payloads; production callers pass [`MAX_CHUNK_SIZE`].
pub(crate) async fn upload_chunks(
    transport: &Transport,
    session_url: &str,
    data: &[u8],
    chunk_size: usize,
) -> Result<Value> {
    let cancel = transport.config().cancel.clone();
    let mut offset = 0usize;

    loop {
        let remaining = data.len() - offset;
        let chunk_len = remaining.min(chunk_size);
        let is_last = offset + chunk_len >= data.len();
        let chunk = data[offset..offset + chunk_len].to_vec();

        let mut headers = transport.build_headers().await?;
        headers.insert(
            UPLOAD_COMMAND,
            HeaderValue::from_static(if is_last { "upload, finalize" } else { "upload" }),
        );
        headers.insert(
            UPLOAD_OFFSET,
            HeaderValue::from_str(&offset.to_string())
                .map_err(|e| Error::Config(format!("invalid upload offset header: {e}")))?,
        );
        headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from_str(&chunk_len.to_string())
                .map_err(|e| Error::Config(format!("invalid content length header: {e}")))?,
        );
        debug!(offset, chunk_len, is_last, "uploading chunk");

        let request = transport
            .http()
            .post(session_url)
            .headers(headers)
            .body(chunk);
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(format!("uploading chunk at offset {offset}")));
            }
            result = request.send() => result
                .map_err(|e| Error::transport(format!("uploading chunk at offset {offset}"), e))?,
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let reason = status.canonical_reason();
            let body = response
                .text()
                .await
                .map_err(|e| Error::transport("reading upload error body", e))?;
            return Err(Error::classify(status.as_u16(), reason, &body));
        }

        let upload_status = response
            .headers()
            .get(UPLOAD_STATUS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if is_last {
            if upload_status != "final" {
                return Err(Error::MalformedBody(format!(
                    "upload did not finalize: status header was {upload_status:?}"
                )));
            }
            let text = response
                .text()
                .await
                .map_err(|e| Error::transport("reading finalize body", e))?;
            return serde_json::from_str(&text).map_err(|e| {
                Error::MalformedBody(format!("finalize response is not valid JSON: {e}"))
            });
        }

        if upload_status != "active" {
            return Err(Error::MalformedBody(format!(
                "upload session ended early at offset {offset}: status header was {upload_status:?}"
            )));
        }
        offset += chunk_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use crate::convert::test_config;
    use serde_json::json;
    use std::sync::Arc;

    fn transport() -> Transport {
        Transport::new(Arc::new(test_config(Backend::GeminiApi))).unwrap()
    }

    #[tokio::test]
    async fn chunks_walk_sequential_offsets_and_finalize_last() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/session")
            .match_header("x-goog-upload-command", "upload")
            .match_header("x-goog-upload-offset", "0")
            .match_header("content-length", "2")
            .match_body("ab")
            .with_status(200)
            .with_header("x-goog-upload-status", "active")
            .create_async()
            .await;
        let second = server
            .mock("POST", "/session")
            .match_header("x-goog-upload-command", "upload")
            .match_header("x-goog-upload-offset", "2")
            .match_header("content-length", "2")
            .match_body("cd")
            .with_status(200)
            .with_header("x-goog-upload-status", "active")
            .create_async()
            .await;
        let last = server
            .mock("POST", "/session")
            .match_header("x-goog-upload-command", "upload, finalize")
            .match_header("x-goog-upload-offset", "4")
            .match_header("content-length", "1")
            .match_body("e")
            .with_status(200)
            .with_header("x-goog-upload-status", "final")
            .with_body(json!({"file": {"name": "files/abc"}}).to_string())
            .create_async()
            .await;

        let transport = transport();
        let session_url = format!("{}/session", server.url());
        let body = upload_chunks(&transport, &session_url, b"abcde", 2)
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        last.assert_async().await;
        assert_eq!(body["file"]["name"], "files/abc");
    }

    #[tokio::test]
    async fn missing_final_status_on_last_chunk_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(200)
            .with_header("x-goog-upload-status", "active")
            .create_async()
            .await;

        let transport = transport();
        let session_url = format!("{}/session", server.url());
        let err = upload_chunks(&transport, &session_url, b"ab", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)), "got {err:?}");
    }
}
