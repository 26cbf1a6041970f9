//! The unified client.

use crate::chats::Chats;
use crate::config::{Backend, ClientConfig, ResolvedConfig};
use crate::files::Files;
use crate::live::Live;
use crate::models::Models;
use crate::transport::Transport;
use crate::Result;
use std::sync::Arc;

/// Entry point for every API call. The backend is resolved once at
/// construction; all resource handles share the same transport and
/// configuration.
pub struct Client {
    config: Arc<ResolvedConfig>,
    transport: Arc<Transport>,
}

impl Client {
    /// Resolve the configuration and build the client. Fails when the
    /// backend is ambiguous or required auth material is missing.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = Arc::new(config.resolve()?);
        let transport = Arc::new(Transport::new(config.clone())?);
        Ok(Client { config, transport })
    }

    /// The backend this client is fixed to.
    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn models(&self) -> Models {
        Models::new(self.transport.clone())
    }

    pub fn chats(&self) -> Chats {
        Chats::new(self.models())
    }

    pub fn files(&self) -> Files {
        Files::new(self.transport.clone())
    }

    pub fn live(&self) -> Live {
        Live::new(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticTokenProvider;

    #[test]
    fn api_key_builds_gemini_client() {
        let client = Client::new(ClientConfig {
            api_key: Some("k".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.backend(), Backend::GeminiApi);
    }

    #[test]
    fn project_location_builds_vertex_client() {
        let client = Client::new(ClientConfig {
            project: Some("p".into()),
            location: Some("l".into()),
            credentials: Some(std::sync::Arc::new(StaticTokenProvider("t".into()))),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.backend(), Backend::VertexAi);
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(Client::new(ClientConfig::default()).is_err());
    }
}
