// src/parser/fragments.rs - Turn classified words and badges into render data

use log::warn;

use crate::cache::BadgeSets;
use crate::parser::words::WordClass;
use crate::types::{Badge, Fragment, ResolvedBadge};

/// Badge set that channels override with their own artwork
pub const SUBSCRIBER_BADGE: &str = "subscriber";

/// Fragments for a chatter's message, one per word in order
///
/// Plain words keep their trailing separator so that concatenating the text
/// fragments gives back the original spacing.
pub fn build_content(words: &[WordClass]) -> Vec<Fragment> {
    words
        .iter()
        .map(|word| match word {
            WordClass::Emote { name, url } => Fragment::Emote {
                name: name.clone(),
                url: url.clone(),
            },
            WordClass::Link { url } => Fragment::Link { url: url.clone() },
            WordClass::Mention { name } => Fragment::Mention { name: name.clone() },
            WordClass::Text { value } => Fragment::text(format!("{} ", value)),
        })
        .collect()
}

/// Body of a system notice
pub fn info_content(text: &str) -> Vec<Fragment> {
    vec![Fragment::text(text)]
}

/// Look up the image of every badge a chatter wears
pub fn resolve_badges(
    badges: &[Badge],
    channel_badges: &BadgeSets,
    global_badges: Option<&BadgeSets>,
) -> Vec<ResolvedBadge> {
    badges
        .iter()
        .map(|badge| resolve_badge(badge, channel_badges, global_badges))
        .collect()
}

/// Subscriber badges prefer the channel's own tier art; everything else is global
pub fn resolve_badge(
    badge: &Badge,
    channel_badges: &BadgeSets,
    global_badges: Option<&BadgeSets>,
) -> ResolvedBadge {
    let channel_image = if badge.name == SUBSCRIBER_BADGE {
        channel_badges
            .get(SUBSCRIBER_BADGE)
            .and_then(|set| set.image_url(&badge.version))
    } else {
        None
    };

    let image_url = channel_image
        .or_else(|| {
            global_badges
                .and_then(|sets| sets.get(&badge.name))
                .and_then(|set| set.image_url(&badge.version))
        })
        .map(str::to_string);

    if image_url.is_none() {
        warn!("No image for badge {} version {}", badge.name, badge.version);
    }

    let alt = match &badge.description {
        Some(description) if !description.is_empty() => format!("{} ({})", badge.name, description),
        _ => badge.name.clone(),
    };

    ResolvedBadge {
        name: badge.name.clone(),
        version: badge.version.clone(),
        alt,
        image_url,
    }
}
