// src/parser/mod.rs - Turns inbound chat events into render records

use log::debug;
use serde::Deserialize;
use std::sync::Arc;

use crate::cache::ResourceCache;
use crate::color::ColorNormalizer;
use crate::config::EngineConfig;
use crate::identity::IdentityProvider;
use crate::types::{
    ChatInfoMessage, ChatMessage, ChatRecord, EventMessage, InboundMessage, Rgb, UserMessage,
    DEFAULT_EVENT_MESSAGE_COLOR, HIGHLIGHTED_MESSAGE_ID,
};

pub mod fragments;
pub mod words;

use words::WordContext;

/// Classification engine between the transport and the renderer
///
/// Each call is independent; the only shared state is the resource cache,
/// which the parser reads but never writes.
pub struct MessageParser {
    cache: Arc<ResourceCache>,
    identity: Arc<dyn IdentityProvider>,
    colors: ColorNormalizer,
    default_user_color: Rgb,
    twitch_emote_cdn: String,
}

impl MessageParser {
    pub fn new(cache: Arc<ResourceCache>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::from_config(cache, identity, &EngineConfig::default())
    }

    pub fn from_config(
        cache: Arc<ResourceCache>,
        identity: Arc<dyn IdentityProvider>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            cache,
            identity,
            colors: config.color_normalizer(),
            default_user_color: config.appearance.default_user_color,
            twitch_emote_cdn: config.endpoints.twitch_emote_cdn.clone(),
        }
    }

    /// Parse one inbound event into zero or more records, in display order
    pub async fn classify(&self, input: &InboundMessage) -> Vec<ChatRecord> {
        match input {
            InboundMessage::User(msg) => vec![ChatRecord::Message(self.parse_user_message(msg).await)],
            InboundMessage::Event(msg) => self.parse_event_message(msg).await,
        }
    }

    /// Like `classify`, for raw JSON; anything that is not a known message shape yields nothing
    pub async fn classify_value(&self, raw: &serde_json::Value) -> Vec<ChatRecord> {
        match InboundMessage::deserialize(raw) {
            Ok(input) => self.classify(&input).await,
            Err(e) => {
                debug!("Ignoring unrecognized chat event: {}", e);
                Vec::new()
            }
        }
    }

    /// Notice record, preceded by the attached user message if there is one
    pub async fn parse_event_message(&self, msg: &EventMessage) -> Vec<ChatRecord> {
        let background_color = msg
            .event
            .as_ref()
            .map(|event| event.kind.background_color())
            .unwrap_or(DEFAULT_EVENT_MESSAGE_COLOR);

        let info = ChatInfoMessage {
            id: msg.id.clone(),
            background_color: background_color.to_string(),
            timestamp: msg.timestamp,
            content: fragments::info_content(&msg.text),
        };

        match &msg.message {
            Some(user) => vec![
                ChatRecord::Message(self.parse_user_message(user).await),
                ChatRecord::Info(info),
            ],
            None => vec![ChatRecord::Info(info)],
        }
    }

    pub async fn parse_user_message(&self, msg: &UserMessage) -> ChatMessage {
        let login = self.identity.logged_in_username().to_lowercase();
        let room_id = msg.tags.room_id.as_deref();

        let channel_badges = self.cache.lookup_badges(&msg.channel, room_id).await;
        let channel_emotes = self.cache.lookup_emotes(&msg.channel, room_id).await;
        let global_badges = self.cache.global_badges().await;
        let global_emotes = self.cache.global_emotes().await;

        let server_emotes = words::server_emote_map(&msg.text, &msg.emotes, &self.twitch_emote_cdn);
        let ctx = WordContext {
            server_emotes: &server_emotes,
            channel_emotes: &channel_emotes,
            global_emotes: global_emotes.as_deref(),
            login: &login,
        };
        let classified = words::classify_words(&msg.text, &ctx);

        let own_message = !login.is_empty() && msg.user_name.to_lowercase() == login;

        ChatMessage {
            id: msg.id.clone(),
            channel: msg.channel.clone(),
            user_name: msg.user_name.clone(),
            user_id: msg.user_id.clone(),
            color: self.colors.normalize(msg.color.unwrap_or(self.default_user_color)),
            badges: fragments::resolve_badges(&msg.badges, &channel_badges, global_badges.as_deref()),
            highlighted: msg.tags.msg_id.as_deref() == Some(HIGHLIGHTED_MESSAGE_ID),
            tagged: classified.tagged,
            action: msg.is_action,
            reply: msg.tags.reply_parent_msg_id.is_some(),
            own_message,
            timestamp: msg.timestamp,
            content: fragments::build_content(&classified.words),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{badge_set, FakeFetcher};
    use crate::cache::{BadgeSets, CacheEvent, EmoteTable};
    use crate::identity::StaticIdentity;
    use crate::types::{Badge, CharRange, Emote, Fragment};

    const CHANNEL: &str = "luckydye";
    const ROOM_ID: &str = "1234";

    fn fetcher() -> FakeFetcher {
        let mut channel_emotes = EmoteTable::new();
        channel_emotes.insert("catJAM".to_string(), "https://cdn/catjam".to_string());
        channel_emotes.insert("Kappa".to_string(), "https://cdn/channel-kappa".to_string());

        let mut global_emotes = EmoteTable::new();
        global_emotes.insert("LUL".to_string(), "https://cdn/lul".to_string());

        let mut channel_badges = BadgeSets::new();
        channel_badges.insert("subscriber".to_string(), badge_set(&[("0", "https://cdn/channel-sub-0")]));

        let mut global_badges = BadgeSets::new();
        global_badges.insert("subscriber".to_string(), badge_set(&[("0", "https://cdn/global-sub-0")]));
        global_badges.insert("moderator".to_string(), badge_set(&[("1", "https://cdn/mod")]));

        FakeFetcher {
            channel_emotes,
            channel_badges,
            global_emotes,
            global_badges,
            ..Default::default()
        }
    }

    /// Parser whose caches are already populated for CHANNEL
    async fn warm_parser(login: &str) -> MessageParser {
        let cache = Arc::new(ResourceCache::new(Arc::new(fetcher())));
        let mut rx = cache.subscribe();

        cache.load_globals().await;
        cache.lookup_emotes(CHANNEL, Some(ROOM_ID)).await;
        cache.lookup_badges(CHANNEL, Some(ROOM_ID)).await;

        let mut channel_tables = 0;
        while channel_tables < 2 {
            let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let CacheEvent::Populated { scope: crate::cache::CacheScope::Channel(_), .. } = event {
                channel_tables += 1;
            }
        }

        MessageParser::new(cache, Arc::new(StaticIdentity::new(login)))
    }

    fn user_message(text: &str) -> UserMessage {
        serde_json::from_value(serde_json::json!({
            "id": "msg-1",
            "channel": CHANNEL,
            "user_name": "someone",
            "user_id": "42",
            "text": text,
            "color": [10, 10, 10],
            "emotes": [],
            "badges": [],
            "timestamp": "2024-05-01T12:00:00Z",
            "is_action": false,
            "bits": 0,
            "tags": { "room-id": ROOM_ID }
        }))
        .unwrap()
    }

    fn event_message(kind: Option<&str>, message: Option<UserMessage>) -> EventMessage {
        serde_json::from_value(serde_json::json!({
            "id": "ev-1",
            "text": "5 raiders incoming",
            "message": message,
            "channel": CHANNEL,
            "timestamp": "2024-05-01T12:00:00Z",
            "event": kind.map(|k| serde_json::json!({ "id": "e", "data": {}, "type": k })),
        }))
        .unwrap()
    }

    fn text_of(content: &[Fragment]) -> String {
        content
            .iter()
            .filter_map(|f| match f {
                Fragment::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_user_message_yields_one_record() {
        let parser = warm_parser("").await;
        let msg = user_message("hello there chat");

        let records = parser.classify(&InboundMessage::User(msg)).await;
        assert_eq!(records.len(), 1);

        let chat = records[0].as_message().unwrap();
        assert_eq!(chat.id, "msg-1");
        assert_eq!(chat.user_name, "someone");
        assert_eq!(text_of(&chat.content).trim_end(), "hello there chat");
        assert!(!chat.tagged && !chat.highlighted && !chat.reply && !chat.action);
        assert_ne!(chat.color, "#0a0a0a");
    }

    #[tokio::test]
    async fn test_substitutions_in_order() {
        let parser = warm_parser("").await;
        let msg = user_message("hi catJAM LUL https://example.com @bob bye");

        let chat = parser.parse_user_message(&msg).await;
        assert_eq!(
            chat.content,
            vec![
                Fragment::text("hi "),
                Fragment::Emote { name: "catJAM".to_string(), url: "https://cdn/catjam".to_string() },
                Fragment::Emote { name: "LUL".to_string(), url: "https://cdn/lul".to_string() },
                Fragment::Link { url: "https://example.com".to_string() },
                Fragment::Mention { name: "@bob".to_string() },
                Fragment::text("bye "),
            ]
        );
    }

    #[tokio::test]
    async fn test_server_emote_beats_channel_emote() {
        let parser = warm_parser("").await;
        let mut msg = user_message("Kappa and Kappa");
        msg.emotes = vec![Emote {
            id: "25".to_string(),
            char_range: CharRange::new(0, 5),
            name: "Kappa".to_string(),
        }];

        let chat = parser.parse_user_message(&msg).await;
        let server_url = "https://static-cdn.jtvnw.net/emoticons/v2/25/default/dark/2.0";
        assert_eq!(
            chat.content[0],
            Fragment::Emote { name: "Kappa".to_string(), url: server_url.to_string() }
        );
        // Recurrences of the span text resolve to the same emote
        assert_eq!(
            chat.content[2],
            Fragment::Emote { name: "Kappa".to_string(), url: server_url.to_string() }
        );
    }

    #[tokio::test]
    async fn test_self_mention_tags_message() {
        let parser = warm_parser("dyex").await;
        let chat = parser.parse_user_message(&user_message("hello DyeXfan")).await;

        assert!(chat.tagged);
        assert_eq!(chat.content[1], Fragment::Mention { name: "DyeXfan".to_string() });
        assert!(!chat.own_message);
    }

    #[tokio::test]
    async fn test_own_message() {
        let parser = warm_parser("someone").await;
        let chat = parser.parse_user_message(&user_message("hi")).await;
        assert!(chat.own_message);
    }

    #[tokio::test]
    async fn test_highlight_reply_and_action_flags() {
        let parser = warm_parser("").await;

        let mut msg = user_message("look at me");
        msg.tags.msg_id = Some("highlighted-message".to_string());
        msg.tags.reply_parent_msg_id = Some("parent-1".to_string());
        msg.is_action = true;
        let chat = parser.parse_user_message(&msg).await;
        assert!(chat.highlighted);
        assert!(chat.reply);
        assert!(chat.action);

        msg.tags.msg_id = Some("skip-subs-mode-message".to_string());
        msg.tags.reply_parent_msg_id = None;
        let chat = parser.parse_user_message(&msg).await;
        assert!(!chat.highlighted);
        assert!(!chat.reply);
    }

    #[tokio::test]
    async fn test_badges_resolved() {
        let parser = warm_parser("").await;
        let mut msg = user_message("hi");
        msg.badges = vec![
            Badge { id: "s".to_string(), name: "subscriber".to_string(), version: "0".to_string(), description: Some("5 months".to_string()) },
            Badge { id: "m".to_string(), name: "moderator".to_string(), version: "1".to_string(), description: None },
            Badge { id: "x".to_string(), name: "unknown".to_string(), version: "1".to_string(), description: None },
        ];

        let chat = parser.parse_user_message(&msg).await;
        assert_eq!(chat.badges[0].image_url.as_deref(), Some("https://cdn/channel-sub-0"));
        assert_eq!(chat.badges[0].alt, "subscriber (5 months)");
        assert_eq!(chat.badges[1].image_url.as_deref(), Some("https://cdn/mod"));
        assert_eq!(chat.badges[2].image_url, None);
    }

    #[tokio::test]
    async fn test_raid_without_message() {
        let parser = warm_parser("").await;
        let records = parser
            .classify(&InboundMessage::Event(event_message(Some("Raid"), None)))
            .await;

        assert_eq!(records.len(), 1);
        let info = records[0].as_info().unwrap();
        assert_eq!(info.background_color, "rgb(33, 27, 37)");
        assert_eq!(info.content, vec![Fragment::text("5 raiders incoming")]);
    }

    #[tokio::test]
    async fn test_resub_with_message_puts_user_first() {
        let parser = warm_parser("").await;
        let records = parser
            .classify(&InboundMessage::Event(event_message(
                Some("SubOrResub"),
                Some(user_message("12 months LUL")),
            )))
            .await;

        assert_eq!(records.len(), 2);
        assert!(records[0].as_message().is_some());
        assert_eq!(records[1].as_info().unwrap().id, "ev-1");
    }

    #[tokio::test]
    async fn test_unknown_or_missing_event_type_uses_default_color() {
        let parser = warm_parser("").await;

        for event in [event_message(Some("HypeTrain"), None), event_message(None, None)] {
            let records = parser.parse_event_message(&event).await;
            assert_eq!(records[0].as_info().unwrap().background_color, "rgb(12, 12, 12)");
        }
    }

    #[tokio::test]
    async fn test_unknown_shape_yields_nothing() {
        let parser = warm_parser("").await;

        assert!(parser.classify_value(&serde_json::json!({ "message_type": "whisper" })).await.is_empty());
        assert!(parser.classify_value(&serde_json::json!([1, 2, 3])).await.is_empty());

        let records = parser
            .classify_value(&serde_json::json!({ "message_type": "user", "text": "bare" }))
            .await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_null_and_odd_fields_still_render() {
        let parser = warm_parser("").await;
        let variants = [
            ("emotes", serde_json::json!({ "emotes": null })),
            ("badges", serde_json::json!({ "badges": null })),
            ("tags", serde_json::json!({ "tags": null })),
            ("bits", serde_json::json!({ "bits": null })),
            ("numeric room-id", serde_json::json!({ "tags": { "room-id": 1234 } })),
            ("color out of range", serde_json::json!({ "color": [256, -1, 10] })),
            ("string badge version", serde_json::json!({ "badges": [{ "name": "subscriber", "version": "12" }] })),
        ];

        for (label, fields) in variants {
            let mut raw = serde_json::json!({ "message_type": "user", "channel": CHANNEL, "text": "hi LUL" });
            for (key, value) in fields.as_object().unwrap() {
                raw[key] = value.clone();
            }

            let records = parser.classify_value(&raw).await;
            assert_eq!(records.len(), 1, "{} should still yield a message", label);
            let chat = records[0].as_message().unwrap();
            assert_eq!(
                chat.content[1],
                Fragment::Emote { name: "LUL".to_string(), url: "https://cdn/lul".to_string() },
                "{}",
                label
            );
        }
    }

    #[tokio::test]
    async fn test_numeric_room_id_uses_channel_tables() {
        let parser = warm_parser("").await;
        let raw = serde_json::json!({
            "message_type": "user",
            "channel": CHANNEL,
            "text": "catJAM",
            "badges": [{ "name": "subscriber", "version": 0 }],
            "tags": { "room-id": 1234 }
        });

        let records = parser.classify_value(&raw).await;
        let chat = records[0].as_message().unwrap();
        assert_eq!(
            chat.content[0],
            Fragment::Emote { name: "catJAM".to_string(), url: "https://cdn/catjam".to_string() }
        );
        assert_eq!(chat.badges[0].version, "0");
        assert_eq!(chat.badges[0].image_url.as_deref(), Some("https://cdn/channel-sub-0"));
    }

    #[tokio::test]
    async fn test_null_event_type_uses_default_color() {
        let parser = warm_parser("").await;

        for kind in [serde_json::Value::Null, serde_json::json!(42)] {
            let raw = serde_json::json!({
                "message_type": "event",
                "text": "something happened",
                "event": { "type": kind }
            });

            let records = parser.classify_value(&raw).await;
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].as_info().unwrap().background_color, "rgb(12, 12, 12)");
        }
    }

    #[tokio::test]
    async fn test_cold_cache_still_renders() {
        let fetcher = Arc::new(fetcher());
        let cache = Arc::new(ResourceCache::new(fetcher));
        let parser = MessageParser::new(cache, Arc::new(StaticIdentity::anonymous()));

        let chat = parser.parse_user_message(&user_message("catJAM LUL")).await;
        assert_eq!(chat.content, vec![Fragment::text("catJAM "), Fragment::text("LUL ")]);
    }
}
