//! Timer synchronization message structure

use serde::{Deserialize, Serialize};

/// Kind of a timer synchronization message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    TimerStart,
    TimerPause,
    TimerReset,
    TimerUpdate,
}

impl MessageType {
    /// Wire name of the message type
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::TimerStart => "timer_start",
            MessageType::TimerPause => "timer_pause",
            MessageType::TimerReset => "timer_reset",
            MessageType::TimerUpdate => "timer_update",
        }
    }
}

/// A single message on the synchronization channel.
///
/// Messages carry no sequence number or timestamp; receivers apply them in
/// the order the channel delivers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Remaining seconds, only meaningful on `timer_update`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
}

impl TimerMessage {
    /// Build a start/pause/reset message, which never carries a duration
    pub fn control(kind: MessageType, session_id: &str, exercise_id: &str) -> Self {
        Self {
            kind,
            session_id: Some(session_id.to_string()),
            duration: None,
            exercise_id: Some(exercise_id.to_string()),
        }
    }

    /// Build a `timer_update` message carrying the sender's remaining seconds
    pub fn update(session_id: &str, remaining: u32, exercise_id: &str) -> Self {
        Self {
            kind: MessageType::TimerUpdate,
            session_id: Some(session_id.to_string()),
            duration: Some(remaining),
            exercise_id: Some(exercise_id.to_string()),
        }
    }

    /// Decode a message from its JSON text
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encode the message as JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Check whether the message is scoped to the given session.
    /// Unscoped messages match no session.
    pub fn is_for(&self, session_id: &str) -> bool {
        self.session_id.as_deref() == Some(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_omit_duration() {
        let msg = TimerMessage::control(MessageType::TimerPause, "abc", "Squats");
        let json = msg.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"timer_pause","sessionId":"abc","exerciseId":"Squats"}"#
        );
    }

    #[test]
    fn update_carries_remaining_seconds() {
        let msg = TimerMessage::parse(
            r#"{"type":"timer_update","sessionId":"abc","duration":42,"exerciseId":"Plank"}"#,
        )
        .unwrap();
        assert_eq!(msg.kind, MessageType::TimerUpdate);
        assert_eq!(msg.duration, Some(42));
        assert_eq!(msg.exercise_id.as_deref(), Some("Plank"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let msg = TimerMessage::parse(r#"{"type":"timer_start","sessionId":"s1","extra":[1,2]}"#)
            .unwrap();
        assert_eq!(msg.kind, MessageType::TimerStart);
        assert!(msg.is_for("s1"));
    }

    #[test]
    fn rejects_values_outside_the_protocol() {
        assert!(TimerMessage::parse(r#"{"type":"timer_stop","sessionId":"s1"}"#).is_err());
        assert!(TimerMessage::parse(r#"{"type":"timer_update","duration":-3}"#).is_err());
        assert!(TimerMessage::parse(r#"{"type":"timer_update","duration":1.5}"#).is_err());
        assert!(TimerMessage::parse("not json").is_err());
    }

    #[test]
    fn unscoped_messages_match_no_session() {
        let msg = TimerMessage::parse(r#"{"type":"timer_reset"}"#).unwrap();
        assert!(msg.session_id.is_none());
        assert!(!msg.is_for("abc"));
        assert!(!msg.is_for(""));
    }
}
