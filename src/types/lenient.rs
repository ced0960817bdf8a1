// src/types/lenient.rs - Field deserializers that fall back instead of rejecting a message

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{EventType, Rgb};

/// Explicit `null` reads like a missing key
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DateTime<Utc>>::deserialize(deserializer)?.unwrap_or_else(Utc::now))
}

/// Strings as-is, numbers and booleans in their JSON form, anything else empty
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_or_number(deserializer)?.unwrap_or_default())
}

pub fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Unrecognized, null or non-string event types become `Unknown`
pub fn event_type<'de, D>(deserializer: D) -> Result<EventType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|raw| EventType::deserialize(raw).ok())
        .unwrap_or(EventType::Unknown))
}

/// `[r, g, b]` with components clamped to 0..=255, or a `#rrggbb` string
///
/// Anything else reads as no color.
pub fn color<'de, D>(deserializer: D) -> Result<Option<Rgb>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) if items.len() == 3 => {
            let channels: Option<Vec<u8>> = items.iter().map(clamp_channel).collect();
            channels.map(|c| Rgb(c[0], c[1], c[2]))
        }
        Some(Value::String(hex)) => parse_hex(&hex),
        _ => None,
    })
}

fn clamp_channel(value: &Value) -> Option<u8> {
    value.as_f64().map(|c| c.round().clamp(0.0, 255.0) as u8)
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }

    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "color")]
        color: Option<Rgb>,
        #[serde(default, deserialize_with = "string_or_number")]
        version: String,
        #[serde(default = "unknown", deserialize_with = "event_type")]
        kind: EventType,
    }

    fn unknown() -> EventType {
        EventType::Unknown
    }

    fn fields(raw: Value) -> Fields {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_color_forms() {
        assert_eq!(fields(json!({ "color": [10, 20, 30] })).color, Some(Rgb(10, 20, 30)));
        assert_eq!(fields(json!({ "color": [300, -4, 12.6] })).color, Some(Rgb(255, 0, 13)));
        assert_eq!(fields(json!({ "color": "#FF8000" })).color, Some(Rgb(255, 128, 0)));
        assert_eq!(fields(json!({ "color": "orange" })).color, None);
        assert_eq!(fields(json!({ "color": [1, 2] })).color, None);
        assert_eq!(fields(json!({ "color": null })).color, None);
    }

    #[test]
    fn test_version_forms() {
        assert_eq!(fields(json!({ "version": "blue-1" })).version, "blue-1");
        assert_eq!(fields(json!({ "version": 12 })).version, "12");
        assert_eq!(fields(json!({ "version": null })).version, "");
        assert_eq!(fields(json!({})).version, "");
    }

    #[test]
    fn test_event_type_forms() {
        assert_eq!(fields(json!({ "kind": "Raid" })).kind, EventType::Raid);
        assert_eq!(fields(json!({ "kind": "HypeTrain" })).kind, EventType::Unknown);
        assert_eq!(fields(json!({ "kind": null })).kind, EventType::Unknown);
        assert_eq!(fields(json!({ "kind": 7 })).kind, EventType::Unknown);
    }
}
