// src/parser/words.rs - Per-word substitution: emotes, links and mentions

use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::cache::EmoteTable;
use crate::types::Emote;

/// What a single word of a message turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordClass {
    Emote { name: String, url: String },
    Link { url: String },
    Mention { name: String },
    Text { value: String },
}

/// Lookup tables a message is resolved against
#[derive(Debug, Clone, Copy)]
pub struct WordContext<'a> {
    /// Span text -> url for the emotes the server asserted on this message
    pub server_emotes: &'a HashMap<String, String>,
    pub channel_emotes: &'a EmoteTable,
    pub global_emotes: Option<&'a EmoteTable>,
    /// Lowercased login of the viewer, empty when logged out
    pub login: &'a str,
}

/// Result of classifying every word of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedText {
    pub words: Vec<WordClass>,
    /// Some word contains the viewer's login
    pub tagged: bool,
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:https?://|www\.)[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+(?::\d{1,5})?(?:[/?#]\S*)?",
        )
        .expect("url pattern is valid")
    })
}

fn mention_pattern() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"@[a-zA-Z0-9]+").expect("mention pattern is valid"))
}

/// CDN url of a server-asserted emote
pub fn twitch_emote_url(cdn_base: &str, emote_id: &str) -> String {
    format!("{}/{}/default/dark/2.0", cdn_base.trim_end_matches('/'), emote_id)
}

/// Map the literal text under every emote span to its image url
///
/// Built once per message, before the text is split, so that every later
/// occurrence of the same word resolves to the asserted emote.
pub fn server_emote_map(text: &str, emotes: &[Emote], cdn_base: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for emote in emotes {
        match emote.char_range.slice(text) {
            Some(word) => {
                map.insert(word.to_string(), twitch_emote_url(cdn_base, &emote.id));
            }
            None => {
                debug!(
                    "Ignoring emote {} with range {}..{} outside of message text",
                    emote.id, emote.char_range.start, emote.char_range.end
                );
            }
        }
    }

    map
}

/// First url inside a word, if any
pub fn find_link(word: &str) -> Option<&str> {
    url_pattern().find(word).map(|m| m.as_str())
}

/// `@name` anywhere in the word
pub fn is_mention(word: &str) -> bool {
    mention_pattern().is_match(word)
}

/// Case-insensitive substring check against the viewer login; `login` must be lowercase
pub fn mentions_user(word: &str, login: &str) -> bool {
    !login.is_empty() && word.to_lowercase().contains(login)
}

/// Decide what a single word becomes; the first matching rule wins
pub fn resolve_word(word: &str, ctx: &WordContext<'_>) -> WordClass {
    if let Some(url) = ctx.server_emotes.get(word) {
        return WordClass::Emote {
            name: word.to_string(),
            url: url.clone(),
        };
    }

    if let Some(url) = ctx.channel_emotes.get(word) {
        return WordClass::Emote {
            name: word.to_string(),
            url: url.clone(),
        };
    }

    if let Some(url) = ctx.global_emotes.and_then(|table| table.get(word)) {
        return WordClass::Emote {
            name: word.to_string(),
            url: url.clone(),
        };
    }

    // The match is the key; only a word that is exactly the url becomes a link
    if let Some(url) = find_link(word) {
        if url == word {
            return WordClass::Link {
                url: url.to_string(),
            };
        }
    }

    if is_mention(word) || mentions_user(word, ctx.login) {
        return WordClass::Mention {
            name: word.to_string(),
        };
    }

    WordClass::Text {
        value: word.to_string(),
    }
}

/// Split on single spaces and classify each word in order
pub fn classify_words(text: &str, ctx: &WordContext<'_>) -> ClassifiedText {
    let mut tagged = false;

    let words = text
        .split(' ')
        .map(|word| {
            if mentions_user(word, ctx.login) {
                tagged = true;
            }
            resolve_word(word, ctx)
        })
        .collect();

    ClassifiedText { words, tagged }
}
