//! # Chat Line Classification Engine
//!
//! Turns raw live-stream chat events into render-ready records: flags for
//! highlighted, tagged, reply and `/me` messages, resolved badges, a readable
//! username color, and a sequence of typed fragments (text, emote, link, mention).
//!
//! ## Features
//!
//! - **Fixed substitution precedence**: server-asserted emotes, then channel and
//!   global emotes, then links, then mentions
//! - **Lazy resource cache**: per-channel emote and badge tables fetched in the
//!   background on first use, never blocking a message
//! - **Readable colors**: username colors lifted to a minimum contrast
//! - **Graceful degradation**: lookups that miss fall back to plain text
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatline::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::load_or_create("config").await?;
//!
//!     let fetcher = Arc::new(TwitchResourceFetcher::new(config.endpoints.clone())?);
//!     let cache = Arc::new(ResourceCache::new(fetcher));
//!     cache.load_globals().await;
//!
//!     let identity = Arc::new(StaticIdentity::new(config.identity.username.clone()));
//!     let parser = MessageParser::from_config(cache, identity, &config);
//!
//!     let raw = serde_json::json!({ "message_type": "user", "channel": "luckydye", "text": "hi Kappa" });
//!     for record in parser.classify_value(&raw).await {
//!         println!("{}", serde_json::to_string(&record)?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod color;
pub mod config;
pub mod identity;
pub mod parser;
pub mod platforms;
pub mod types;

// Re-export commonly used items
pub mod prelude {
    pub use crate::cache::{CacheEvent, ResourceCache, ResourceFetcher};
    pub use crate::color::ColorNormalizer;
    pub use crate::config::EngineConfig;
    pub use crate::identity::{IdentityProvider, SessionIdentity, StaticIdentity};
    pub use crate::parser::MessageParser;
    pub use crate::platforms::TwitchResourceFetcher;
    pub use crate::types::{
        ChatInfoMessage, ChatMessage, ChatRecord, EventMessage, Fragment, InboundMessage,
        UserMessage,
    };
    pub use anyhow::Result;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
