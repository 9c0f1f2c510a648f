//! Inbound host messages.
//!
//! The host posts JSON objects discriminated by `type`. Field names follow
//! the host's camelCase convention. Unknown message types deserialize to
//! [`InboundMessage::Unknown`] and are ignored by the service.

use bridge_traits::PlaybackQuality;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InboundMessage {
    Init {
        quality: Option<PlaybackQuality>,
    },
    #[serde(rename_all = "camelCase")]
    Play {
        youtube_id: Option<String>,
        volume: Option<f64>,
        start_seconds: Option<f64>,
    },
    Stop,
    UpdateVolume {
        volume: Option<f64>,
    },
    PlayJamSound {
        sound: Option<String>,
        volume: Option<f64>,
    },
    PreloadJamSounds {
        /// `None` unless the host sent a list. Non-string entries are dropped.
        #[serde(default, deserialize_with = "string_list")]
        sounds: Option<Vec<String>>,
    },
    #[serde(rename = "updateAOP", rename_all = "camelCase")]
    UpdateAop {
        #[serde(default)]
        visible: bool,
        zone_name: Option<String>,
        player_count: Option<u32>,
    },
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Init { .. } => "init",
            InboundMessage::Play { .. } => "play",
            InboundMessage::Stop => "stop",
            InboundMessage::UpdateVolume { .. } => "updateVolume",
            InboundMessage::PlayJamSound { .. } => "playJamSound",
            InboundMessage::PreloadJamSounds { .. } => "preloadJamSounds",
            InboundMessage::UpdateAop { .. } => "updateAOP",
            InboundMessage::Unknown => "unknown",
        }
    }
}

fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(sound) => Some(sound),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play() {
        let message =
            InboundMessage::from_json(r#"{"type":"play","youtubeId":"abc","volume":0.5,"startSeconds":12}"#)
                .unwrap();
        assert_eq!(
            message,
            InboundMessage::Play {
                youtube_id: Some("abc".to_string()),
                volume: Some(0.5),
                start_seconds: Some(12.0),
            }
        );
    }

    #[test]
    fn parses_init_quality() {
        let message = InboundMessage::from_json(r#"{"type":"init","quality":"hd720"}"#).unwrap();
        assert_eq!(
            message,
            InboundMessage::Init {
                quality: Some(PlaybackQuality::Hd720)
            }
        );
        let message = InboundMessage::from_json(r#"{"type":"init"}"#).unwrap();
        assert_eq!(message, InboundMessage::Init { quality: None });
    }

    #[test]
    fn parses_zone_update() {
        let message = InboundMessage::from_json(
            r#"{"type":"updateAOP","visible":true,"zoneName":"Docks","playerCount":4}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            InboundMessage::UpdateAop {
                visible: true,
                zone_name: Some("Docks".to_string()),
                player_count: Some(4),
            }
        );
        assert_eq!(message.kind(), "updateAOP");
    }

    #[test]
    fn sounds_must_be_a_list() {
        let message =
            InboundMessage::from_json(r#"{"type":"preloadJamSounds","sounds":"a.wav"}"#).unwrap();
        assert_eq!(message, InboundMessage::PreloadJamSounds { sounds: None });

        let message = InboundMessage::from_json(
            r#"{"type":"preloadJamSounds","sounds":["a.wav",3,"b.wav"]}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            InboundMessage::PreloadJamSounds {
                sounds: Some(vec!["a.wav".to_string(), "b.wav".to_string()])
            }
        );
    }

    #[test]
    fn unknown_types_are_tolerated() {
        let message = InboundMessage::from_json(r#"{"type":"dance","speed":3}"#).unwrap();
        assert_eq!(message, InboundMessage::Unknown);
    }

    #[test]
    fn missing_type_is_an_error() {
        assert!(InboundMessage::from_json(r#"{"volume":0.5}"#).is_err());
        assert!(InboundMessage::from_json("not json").is_err());
    }
}
