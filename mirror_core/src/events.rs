// Remote event channel decoding. Events arrive as a name plus a JSON payload.

use serde::Deserialize;

use crate::error::EngineError;
use crate::types::TryOnCandidate;

pub const TRIGGER_TRYON: &str = "trigger_tryon";
pub const SELECT_ITEM: &str = "try_on_selected_item";
pub const HIDE_TRYON: &str = "hide_tryon";

/// `trigger_tryon` payload. `items` is present when the voice service
/// already ran the catalog query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TriggerPayload {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub items: Option<Vec<TryOnCandidate>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SelectionPayload {
    index: i64,
}

/// An event the try-on core reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    TriggerTryOn(TriggerPayload),
    SelectItem { index: i64 },
    HideTryOn,
    /// Voice status, audio queue and anything else outside the try-on core.
    Passthrough(String),
}

impl RemoteEvent {
    pub fn decode(name: &str, payload: &str) -> Result<RemoteEvent, EngineError> {
        let payload = if payload.trim().is_empty() {
            "null"
        } else {
            payload
        };
        let invalid = |e: serde_json::Error| EngineError::InvalidEvent {
            name: name.to_string(),
            message: e.to_string(),
        };

        match name {
            TRIGGER_TRYON => {
                let trigger: Option<TriggerPayload> =
                    serde_json::from_str(payload).map_err(invalid)?;
                Ok(RemoteEvent::TriggerTryOn(trigger.unwrap_or_default()))
            }
            SELECT_ITEM => {
                let selection: SelectionPayload =
                    serde_json::from_str(payload).map_err(invalid)?;
                Ok(RemoteEvent::SelectItem {
                    index: selection.index,
                })
            }
            HIDE_TRYON => Ok(RemoteEvent::HideTryOn),
            other => Ok(RemoteEvent::Passthrough(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_trigger() {
        let event = RemoteEvent::decode(
            "trigger_tryon",
            r#"{"category":"men's clothing","color":"blue","max_price":40}"#,
        )
        .unwrap();
        match event {
            RemoteEvent::TriggerTryOn(payload) => {
                assert_eq!(payload.category.as_deref(), Some("men's clothing"));
                assert_eq!(payload.max_price, Some(40.0));
                assert!(payload.items.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn trigger_without_payload_has_no_category() {
        for payload in ["", "null", "{}", r#"{"category":null}"#] {
            assert_eq!(
                RemoteEvent::decode("trigger_tryon", payload).unwrap(),
                RemoteEvent::TriggerTryOn(TriggerPayload::default())
            );
        }
    }

    #[test]
    fn decodes_selection_and_hide() {
        assert_eq!(
            RemoteEvent::decode("try_on_selected_item", r#"{"index":2}"#).unwrap(),
            RemoteEvent::SelectItem { index: 2 }
        );
        assert_eq!(
            RemoteEvent::decode("hide_tryon", "").unwrap(),
            RemoteEvent::HideTryOn
        );
    }

    #[test]
    fn selection_needs_index() {
        let err = RemoteEvent::decode("try_on_selected_item", "{}").unwrap_err();
        assert!(matches!(err, EngineError::InvalidEvent { .. }));
    }

    #[test]
    fn audio_events_pass_through() {
        assert_eq!(
            RemoteEvent::decode("play_audio", r#"{"audio_url":"a.mp3","text":"hi"}"#).unwrap(),
            RemoteEvent::Passthrough("play_audio".into())
        );
        assert_eq!(
            RemoteEvent::decode("start_listening", "").unwrap(),
            RemoteEvent::Passthrough("start_listening".into())
        );
    }
}
