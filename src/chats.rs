//! Multi-turn chat sessions.
//!
//! A chat owns its conversation history and replays it on every message. The
//! model's reply is recorded in sanitized form: the role is forced to
//! "model" and parts holding an empty text string are dropped, so a replayed
//! history never contains frames the service would reject.

use crate::models::Models;
use crate::types::{Content, GenerateContentConfig, GenerateContentResponse, Part};
use crate::Result;

/// Chat factory, obtained from [`crate::Client::chats`].
pub struct Chats {
    models: Models,
}

impl Chats {
    pub(crate) fn new(models: Models) -> Self {
        Chats { models }
    }

    /// Start a chat against `model`, optionally seeded with prior history.
    pub fn create(
        self,
        model: impl Into<String>,
        config: Option<GenerateContentConfig>,
        history: Vec<Content>,
    ) -> Chat {
        Chat {
            models: self.models,
            model: model.into(),
            config,
            history,
        }
    }
}

/// An ongoing conversation.
pub struct Chat {
    models: Models,
    model: String,
    config: Option<GenerateContentConfig>,
    history: Vec<Content>,
}

impl Chat {
    /// Send one user message; the full history travels with it. On success
    /// the user turn and the first candidate's sanitized content are appended
    /// to the history.
    pub async fn send_message(&mut self, parts: Vec<Part>) -> Result<GenerateContentResponse> {
        let user_turn = Content {
            role: Some("user".to_string()),
            parts,
        };
        let mut contents = self.history.clone();
        contents.push(user_turn.clone());

        let response = self
            .models
            .generate_content(&self.model, contents, self.config.clone())
            .await?;

        self.history.push(user_turn);
        if let Some(content) = response.candidates.first().and_then(|c| c.content.clone()) {
            self.history.push(sanitize_model_content(content));
        }
        Ok(response)
    }

    pub fn history(&self) -> &[Content] {
        &self.history
    }
}

fn sanitize_model_content(mut content: Content) -> Content {
    content.role = Some("model".to_string());
    content.parts.retain(|part| part.text.as_deref() != Some(""));
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_forces_model_role_and_drops_empty_text() {
        let content = Content {
            role: None,
            parts: vec![Part::text("answer"), Part::text(""), Part::default()],
        };
        let sanitized = sanitize_model_content(content);
        assert_eq!(sanitized.role.as_deref(), Some("model"));
        assert_eq!(sanitized.parts.len(), 2);
        assert_eq!(sanitized.parts[0].text.as_deref(), Some("answer"));
        // A part without text at all is kept; only empty text is noise.
        assert_eq!(sanitized.parts[1].text, None);
    }
}
