//! Realtime bidirectional session over a persistent WebSocket.
//!
//! Connecting performs the full handshake: open the socket, send exactly one
//! setup frame, and block until the server acknowledges it. After that the
//! session carries one message type per frame in each direction. The
//! intended concurrency model is one sender and one receiver; [`Session::split`]
//! hands out the two independent halves.

use crate::config::{Backend, ResolvedConfig};
use crate::convert::{mldev, vertex};
use crate::types::{
    deep_marshal, map_to_struct, Content, FunctionResponse, LiveClientContent, LiveClientMessage,
    LiveClientRealtimeInput, LiveClientToolResponse, LiveConnectConfig, LiveServerMessage,
};
use crate::{Error, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Entry point for realtime sessions, obtained from [`crate::Client::live`].
pub struct Live {
    config: std::sync::Arc<ResolvedConfig>,
}

/// WebSocket endpoint for the active backend. The Gemini Developer API
/// authenticates through a key query parameter; Vertex AI through the bearer
/// header added at connect time.
fn websocket_url(cfg: &ResolvedConfig) -> Result<String> {
    let base = cfg
        .base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    let base = base.trim_end_matches('/');
    match cfg.backend {
        Backend::GeminiApi => {
            let key = cfg.api_key.as_deref().ok_or_else(|| {
                Error::Config("realtime sessions on the Gemini API require an API key".to_string())
            })?;
            Ok(format!(
                "{base}/ws/google.ai.generativelanguage.{}.GenerativeService.BidiGenerateContent?key={key}",
                cfg.api_version
            ))
        }
        Backend::VertexAi => Ok(format!(
            "{base}/ws/google.cloud.aiplatform.{}.LlmBidiService/BidiGenerateContent",
            cfg.api_version
        )),
    }
}

/// Build the one-time setup frame for a session.
fn setup_frame(
    cfg: &ResolvedConfig,
    model: &str,
    config: Option<&LiveConnectConfig>,
) -> Result<Value> {
    let mut params = json!({ "model": cfg.model_full_name(model) });
    if let Some(config) = config {
        params["config"] = deep_marshal(config)?;
    }
    let converter = match cfg.backend {
        Backend::GeminiApi => mldev::live_connect_parameters_to_wire,
        Backend::VertexAi => vertex::live_connect_parameters_to_wire,
    };
    let mut parent = json!({});
    converter(cfg, &params, &mut parent)
}

/// Reject messages that must not travel through the general send path.
fn validate_outgoing(message: &LiveClientMessage) -> Result<()> {
    if message.setup.is_some() {
        return Err(Error::Session(
            "setup is sent once during connect and cannot be resent on an open session"
                .to_string(),
        ));
    }
    Ok(())
}

impl Live {
    pub(crate) fn new(config: std::sync::Arc<ResolvedConfig>) -> Self {
        Live { config }
    }

    /// Open a session: connect, send the setup frame, and wait for the
    /// server's acknowledgement.
    pub async fn connect(
        &self,
        model: &str,
        config: Option<LiveConnectConfig>,
    ) -> Result<Session> {
        let cfg = &self.config;
        let url = websocket_url(cfg)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::transport("building websocket request", e))?;
        if cfg.backend == Backend::VertexAi {
            let provider = cfg.credentials.as_ref().ok_or_else(|| {
                Error::Config("realtime sessions on Vertex AI require credentials".to_string())
            })?;
            let token = provider.token().await?;
            let value = format!("Bearer {token}")
                .parse()
                .map_err(|_| Error::Config("invalid bearer token value".to_string()))?;
            request
                .headers_mut()
                .insert(tokio_tungstenite::tungstenite::http::header::AUTHORIZATION, value);
        }

        debug!(model, backend = cfg.backend.name(), "opening realtime session");
        let (ws, _response) = connect_async(request)
            .await
            .map_err(|e| Error::transport("opening websocket", e))?;
        let (mut sink, mut source) = ws.split();

        let setup = setup_frame(cfg, model, config.as_ref())?;
        sink.send(Message::Text(setup.to_string()))
            .await
            .map_err(|e| Error::transport("sending session setup", e))?;

        // The first frame must acknowledge the setup before the session is
        // usable.
        let ack = next_json_frame(&mut source).await?.ok_or_else(|| {
            Error::Session("connection closed before setup was acknowledged".to_string())
        })?;
        let ack = decode_server_message(cfg, ack)?;
        if ack.setup_complete.is_none() {
            return Err(Error::Session(
                "server did not acknowledge session setup".to_string(),
            ));
        }

        Ok(Session {
            sender: SessionSender {
                config: self.config.clone(),
                sink,
                closed: false,
            },
            receiver: SessionReceiver {
                config: self.config.clone(),
                source,
            },
        })
    }
}

async fn next_json_frame(source: &mut SplitStream<WsStream>) -> Result<Option<Value>> {
    loop {
        let frame = match source.next().await {
            Some(frame) => frame.map_err(|e| Error::transport("reading session frame", e))?,
            None => return Ok(None),
        };
        let text = match frame {
            Message::Text(text) => text,
            Message::Binary(bytes) => String::from_utf8(bytes).map_err(|e| {
                Error::Session(format!("binary session frame is not UTF-8: {e}"))
            })?,
            Message::Close(_) => return Ok(None),
            // Control frames are handled by the protocol layer.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };
        let value = serde_json::from_str(&text)
            .map_err(|e| Error::Session(format!("session frame is not valid JSON: {e}")))?;
        return Ok(Some(value));
    }
}

fn decode_server_message(cfg: &ResolvedConfig, value: Value) -> Result<LiveServerMessage> {
    if let Some(error) = value.get("error") {
        return Err(Error::Session(format!("server reported an error: {error}")));
    }
    let converter = match cfg.backend {
        Backend::GeminiApi => mldev::live_server_message_from_wire,
        Backend::VertexAi => vertex::live_server_message_from_wire,
    };
    let mut parent = json!({});
    let converted = converter(cfg, &value, &mut parent)?;
    map_to_struct(converted)
}

/// An open realtime session.
pub struct Session {
    sender: SessionSender,
    receiver: SessionReceiver,
}

impl Session {
    /// Split into independent send and receive halves for concurrent use.
    pub fn split(self) -> (SessionSender, SessionReceiver) {
        (self.sender, self.receiver)
    }

    pub async fn send(&mut self, message: &LiveClientMessage) -> Result<()> {
        self.sender.send(message).await
    }

    /// Send conversational turns. `turn_complete` defaults to true when not
    /// overridden via [`Session::send`].
    pub async fn send_client_content(&mut self, turns: Vec<Content>) -> Result<()> {
        self.sender.send_client_content(turns).await
    }

    pub async fn send_realtime_input(&mut self, input: LiveClientRealtimeInput) -> Result<()> {
        self.sender.send_realtime_input(input).await
    }

    pub async fn send_tool_response(&mut self, responses: Vec<FunctionResponse>) -> Result<()> {
        self.sender.send_tool_response(responses).await
    }

    /// Read the next server message. `None` means the server closed the
    /// session.
    pub async fn receive(&mut self) -> Result<Option<LiveServerMessage>> {
        self.receiver.receive().await
    }

    /// Close the session. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.sender.close().await
    }
}

/// Send half of a split session.
pub struct SessionSender {
    config: std::sync::Arc<ResolvedConfig>,
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

impl SessionSender {
    pub async fn send(&mut self, message: &LiveClientMessage) -> Result<()> {
        validate_outgoing(message)?;
        if self.closed {
            return Err(Error::Session("session is closed".to_string()));
        }
        let converter = match self.config.backend {
            Backend::GeminiApi => mldev::live_client_message_to_wire,
            Backend::VertexAi => vertex::live_client_message_to_wire,
        };
        let mut parent = json!({});
        let wire = converter(&self.config, &deep_marshal(message)?, &mut parent)?;
        self.sink
            .send(Message::Text(wire.to_string()))
            .await
            .map_err(|e| Error::transport("sending session frame", e))
    }

    pub async fn send_client_content(&mut self, turns: Vec<Content>) -> Result<()> {
        self.send(&LiveClientMessage {
            client_content: Some(LiveClientContent {
                turns,
                turn_complete: Some(true),
            }),
            ..Default::default()
        })
        .await
    }

    pub async fn send_realtime_input(&mut self, input: LiveClientRealtimeInput) -> Result<()> {
        self.send(&LiveClientMessage {
            realtime_input: Some(input),
            ..Default::default()
        })
        .await
    }

    pub async fn send_tool_response(&mut self, responses: Vec<FunctionResponse>) -> Result<()> {
        self.send(&LiveClientMessage {
            tool_response: Some(LiveClientToolResponse {
                function_responses: responses,
            }),
            ..Default::default()
        })
        .await
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::transport("closing session", e))
    }
}

/// Receive half of a split session.
pub struct SessionReceiver {
    config: std::sync::Arc<ResolvedConfig>,
    source: SplitStream<WsStream>,
}

impl SessionReceiver {
    pub async fn receive(&mut self) -> Result<Option<LiveServerMessage>> {
        match next_json_frame(&mut self.source).await? {
            Some(value) => Ok(Some(decode_server_message(&self.config, value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::test_config;

    #[test]
    fn gemini_websocket_url_carries_key() {
        let cfg = test_config(Backend::GeminiApi);
        assert_eq!(
            websocket_url(&cfg).unwrap(),
            "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent?key=test-key"
        );
    }

    #[test]
    fn vertex_websocket_url_has_no_key() {
        let cfg = test_config(Backend::VertexAi);
        assert_eq!(
            websocket_url(&cfg).unwrap(),
            "wss://us-central1-aiplatform.googleapis.com/ws/google.cloud.aiplatform.v1beta1.LlmBidiService/BidiGenerateContent"
        );
    }

    #[test]
    fn setup_frame_expands_model_and_hoists_config() {
        let cfg = test_config(Backend::GeminiApi);
        let config = LiveConnectConfig {
            response_modalities: vec!["TEXT".into()],
            temperature: Some(0.7),
            ..Default::default()
        };
        let frame = setup_frame(&cfg, "gemini-2.0-flash", Some(&config)).unwrap();
        assert_eq!(
            frame,
            serde_json::json!({
                "setup": {
                    "model": "models/gemini-2.0-flash",
                    "generationConfig": {
                        "responseModalities": ["TEXT"],
                        "temperature": 0.7
                    }
                }
            })
        );
    }

    #[test]
    fn setup_rejected_on_general_send_path() {
        let message = LiveClientMessage {
            setup: Some(Default::default()),
            ..Default::default()
        };
        let err = validate_outgoing(&message).unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }

    #[test]
    fn error_payload_rejected_on_receive() {
        let cfg = test_config(Backend::GeminiApi);
        let err = decode_server_message(
            &cfg,
            serde_json::json!({"error": {"code": 13, "message": "boom"}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("boom"), "got: {err}");
    }

    #[test]
    fn server_content_decodes_to_typed_message() {
        let cfg = test_config(Backend::GeminiApi);
        let message = decode_server_message(
            &cfg,
            serde_json::json!({
                "serverContent": {
                    "modelTurn": {"role": "model", "parts": [{"text": "hi"}]},
                    "turnComplete": true
                }
            }),
        )
        .unwrap();
        let content = message.server_content.unwrap();
        assert_eq!(content.turn_complete, Some(true));
        assert_eq!(content.model_turn.unwrap().parts[0].text.as_deref(), Some("hi"));
    }
}
