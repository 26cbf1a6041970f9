//! # unigenai
//!
//! Unified Rust client for the Gemini generative AI service across its two
//! deployments: the Gemini Developer API and Vertex AI.
//!
//! ## Overview
//!
//! Both deployments expose the same conceptual service but differ in
//! authentication, URL shape, and wire field layout. This crate hides those
//! differences behind a single typed API surface: callers build
//! backend-agnostic request types, and a per-backend structural converter
//! rewrites them into the active deployment's wire shape (and back) without
//! leaking backend details into caller code.
//!
//! ## Key features
//!
//! - **Unified client**: [`Client`] is the single entry point; the backend is
//!   fixed at construction and never consulted by caller code again
//! - **Streaming-first**: server-sent-event responses surface as lazy
//!   [`futures::Stream`]s that can be abandoned early
//! - **Realtime sessions**: bidirectional incremental generation over a
//!   persistent WebSocket via [`live::Live`]
//! - **Resumable uploads**: chunked byte-stream uploads with offset tracking
//!   via [`files::Files::upload`]
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use unigenai::{Client, ClientConfig, types::Content};
//!
//! #[tokio::main]
//! async fn main() -> unigenai::Result<()> {
//!     let client = Client::new(ClientConfig {
//!         api_key: Some("your-api-key".into()),
//!         ..Default::default()
//!     })?;
//!
//!     let response = client
//!         .models()
//!         .generate_content("gemini-2.0-flash", vec![Content::user_text("Hello")], None)
//!         .await?;
//!     println!("{:?}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Module organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Client configuration and backend resolution |
//! | [`types`] | Backend-agnostic domain types and wire encodings |
//! | [`convert`] | Per-backend structural converters |
//! | [`transport`] | HTTP request building, classification, streaming |
//! | [`live`] | Realtime bidirectional session protocol |
//! | [`models`] | Content generation calls |
//! | [`chats`] | Multi-turn chat session bookkeeping |
//! | [`files`] | File listing, upload, download |
//! | [`pager`] | Page-token-driven lazy iteration |

pub mod chats;
pub mod client;
pub mod config;
pub mod convert;
pub mod error;
pub mod files;
pub mod live;
pub mod models;
pub mod pager;
pub mod transport;
pub mod types;
pub mod utils;

pub use client::Client;
pub use config::{
    AccessTokenProvider, Backend, ClientConfig, EnvConfig, HttpOptions, StaticTokenProvider,
};
pub use error::{ApiError, Error};
pub use pager::Pager;

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;
