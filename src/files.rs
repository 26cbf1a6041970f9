//! File upload, listing, and download.
//!
//! The file service only exists on the Gemini Developer API; every operation
//! checks the backend up front and fails with a descriptive error on
//! Vertex AI.

use crate::config::Backend;
use crate::convert::mldev;
use crate::pager::Pager;
use crate::transport::{upload, ApiRequest, Transport};
use crate::types::{
    deep_marshal, map_to_struct, File, ListFilesConfig, ListFilesResponse, UploadFileConfig,
};
use crate::{Error, Result};
use serde_json::json;
use std::sync::Arc;

/// File calls, obtained from [`crate::Client::files`].
pub struct Files {
    transport: Arc<Transport>,
}

impl Files {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Files { transport }
    }

    fn ensure_gemini(&self, operation: &str) -> Result<()> {
        if self.transport.config().backend != Backend::GeminiApi {
            return Err(Error::Config(format!(
                "{operation} is only supported on the Gemini API backend"
            )));
        }
        Ok(())
    }

    /// Upload bytes through a resumable session and return the file resource.
    pub async fn upload(&self, data: Vec<u8>, config: Option<UploadFileConfig>) -> Result<File> {
        self.ensure_gemini("file upload")?;
        let cfg = self.transport.config();
        let config = config.unwrap_or_default();

        let metadata = json!({ "file": deep_marshal(&config)? });
        let session_url = upload::start_session(
            &self.transport,
            data.len(),
            config.mime_type.as_deref(),
            metadata,
        )
        .await?;
        let final_body =
            upload::upload_chunks(&self.transport, &session_url, &data, upload::MAX_CHUNK_SIZE)
                .await?;

        let file_node = final_body.get("file").cloned().ok_or_else(|| {
            Error::MalformedBody("finalize response is missing the file resource".to_string())
        })?;
        let mut parent = json!({});
        map_to_struct(mldev::file_from_wire(cfg, &file_node, &mut parent)?)
    }

    /// Fetch one page of the file listing.
    pub async fn list(&self, config: Option<ListFilesConfig>) -> Result<ListFilesResponse> {
        self.ensure_gemini("file listing")?;
        let cfg = self.transport.config();
        let config = config.unwrap_or_default();

        let mut request = ApiRequest::get("files");
        if let Some(page_size) = config.page_size {
            request = request.query("pageSize", page_size.to_string());
        }
        if let Some(page_token) = config.page_token.filter(|t| !t.is_empty()) {
            request = request.query("pageToken", page_token);
        }
        let raw = self.transport.request_json(request).await?;
        let mut parent = json!({});
        map_to_struct(mldev::list_files_response_from_wire(cfg, &raw, &mut parent)?)
    }

    /// Iterate the whole listing lazily, one page-token fetch at a time.
    pub fn all(&self, config: Option<ListFilesConfig>) -> Result<Pager<File>> {
        self.ensure_gemini("file listing")?;
        let config = config.unwrap_or_default();
        let transport = self.transport.clone();
        let page_size = config.page_size;

        let fetch: crate::pager::PageFetcher<File> = Box::new(move |token: Option<String>| {
            let files = Files {
                transport: transport.clone(),
            };
            Box::pin(async move {
                let page = files
                    .list(Some(ListFilesConfig {
                        page_size,
                        page_token: token,
                    }))
                    .await?;
                Ok((page.files, page.next_page_token))
            })
        });
        Ok(Pager::new(fetch, config.page_token))
    }

    /// Download a file's bytes.
    pub async fn download(&self, name: &str) -> Result<Vec<u8>> {
        self.ensure_gemini("file download")?;
        let resource = if name.starts_with("files/") {
            name.to_string()
        } else {
            format!("files/{name}")
        };
        let request = ApiRequest::get(format!("{resource}:download")).query("alt", "media");
        self.transport.request_bytes(request).await
    }
}
