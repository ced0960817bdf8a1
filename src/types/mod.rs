// src/types/mod.rs - Inbound chat events and outbound render records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod lenient;

/// Background color for every known event type
pub const EVENT_MESSAGE_COLOR: &str = "rgb(33, 27, 37)";

/// Background color used when an event is missing or not recognized
pub const DEFAULT_EVENT_MESSAGE_COLOR: &str = "rgb(12, 12, 12)";

/// `msg-id` value the server uses for paid highlighted messages
pub const HIGHLIGHTED_MESSAGE_ID: &str = "highlighted-message";

// =================================================================
// INBOUND
// =================================================================

/// Half-open span of an emote inside a message, counted in chars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice `text` by this range, or None if the range is empty or out of bounds
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.start >= self.end {
            return None;
        }

        let mut indices = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()));
        let start = indices.nth(self.start)?;
        let end = indices.nth(self.end - self.start - 1)?;
        Some(&text[start..end])
    }
}

/// Emote occurrence asserted by the chat server for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emote {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,
    /// An absent range is empty and never matches
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub char_range: CharRange,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub name: String,
}

/// Badge shown next to a chatter's name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub name: String,
    /// Selects a member of the badge set ("0", "12", "blue-1"); numbers are kept in string form
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub version: String,
    /// Human text like "5 months"
    #[serde(default)]
    pub description: Option<String>,
}

/// Closed set of server events that produce notices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    SubOrResub,
    Raid,
    SubGift,
    SubMysteryGift,
    AnonSubMysteryGift,
    GiftPaidUpgrade,
    AnonGiftPaidUpgrade,
    Ritual,
    BitsBadgeTier,
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// Notice background for this event type
    pub fn background_color(&self) -> &'static str {
        match self {
            EventType::Unknown => DEFAULT_EVENT_MESSAGE_COLOR,
            _ => EVENT_MESSAGE_COLOR,
        }
    }
}

/// Server event attached to a notice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(rename = "type", default = "unknown_event_type", deserialize_with = "lenient::event_type")]
    pub kind: EventType,
}

fn unknown_event_type() -> EventType {
    EventType::Unknown
}

/// RGB triple as sent by the server (`[r, g, b]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Known message tags, with everything else kept in `extra`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageTags {
    #[serde(rename = "room-id", default, deserialize_with = "lenient::optional_string_or_number")]
    pub room_id: Option<String>,
    #[serde(rename = "msg-id", default, deserialize_with = "lenient::optional_string_or_number")]
    pub msg_id: Option<String>,
    #[serde(
        rename = "reply-parent-msg-id",
        default,
        deserialize_with = "lenient::optional_string_or_number"
    )]
    pub reply_parent_msg_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A chatter's message
///
/// Every field tolerates being absent or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub user_name: String,
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub text: String,
    /// Out-of-range components are clamped; unreadable colors count as missing
    #[serde(default, deserialize_with = "lenient::color")]
    pub color: Option<Rgb>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub emotes: Vec<Emote>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub badges: Vec<Badge>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub is_action: bool,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub bits: u64,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub tags: MessageTags,
}

/// System notice, optionally carrying the user's own message (e.g. a resub text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub text: String,
    #[serde(default)]
    pub message: Option<UserMessage>,
    #[serde(default, deserialize_with = "lenient::null_as_default")]
    pub channel: String,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp_or_now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub event: Option<Event>,
}

/// Everything the transport hands to the parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "lowercase")]
pub enum InboundMessage {
    User(UserMessage),
    Event(EventMessage),
}

// =================================================================
// OUTBOUND
// =================================================================

/// One renderable piece of a message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Text { text: String },
    Emote { name: String, url: String },
    Link { url: String },
    Mention { name: String },
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text { text: text.into() }
    }
}

/// Badge with its image already looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBadge {
    pub name: String,
    pub version: String,
    pub alt: String,
    /// None when neither the channel nor the global table knows this version
    pub image_url: Option<String>,
}

/// Parsed chatter message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub channel: String,
    pub user_name: String,
    pub user_id: String,
    pub color: String,
    pub badges: Vec<ResolvedBadge>,
    pub highlighted: bool,
    /// The viewing user was mentioned
    pub tagged: bool,
    /// `/me` message
    pub action: bool,
    pub reply: bool,
    /// Written by the viewing user
    pub own_message: bool,
    pub timestamp: DateTime<Utc>,
    pub content: Vec<Fragment>,
}

/// Parsed system notice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInfoMessage {
    pub id: String,
    pub background_color: String,
    pub timestamp: DateTime<Utc>,
    pub content: Vec<Fragment>,
}

/// Everything the parser hands to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatRecord {
    Message(ChatMessage),
    Info(ChatInfoMessage),
}

impl ChatRecord {
    pub fn as_message(&self) -> Option<&ChatMessage> {
        match self {
            ChatRecord::Message(msg) => Some(msg),
            ChatRecord::Info(_) => None,
        }
    }

    pub fn as_info(&self) -> Option<&ChatInfoMessage> {
        match self {
            ChatRecord::Info(info) => Some(info),
            ChatRecord::Message(_) => None,
        }
    }
}
