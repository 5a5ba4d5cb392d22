use crate::model::Payload;
use serde::{Deserialize, Serialize};

/// Служебные события протокола Phoenix Channels.
pub mod events {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const CLOSE: &str = "phx_close";
    pub const ERROR: &str = "phx_error";
    pub const HEARTBEAT: &str = "heartbeat";

    /// Топик, в который уходят heartbeat-сообщения.
    pub const PHOENIX_TOPIC: &str = "phoenix";
}

/// Сообщение Phoenix V2 JSON: `[join_ref, ref, topic, event, payload]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFrame", into = "RawFrame")]
pub struct Frame {
    pub join_ref: Option<String>,
    pub msg_ref: Option<String>,
    pub topic: String,
    pub event: String,
    pub payload: Payload,
}

#[derive(Serialize, Deserialize)]
struct RawFrame(Option<String>, Option<String>, String, String, Payload);

impl From<RawFrame> for Frame {
    fn from(RawFrame(join_ref, msg_ref, topic, event, payload): RawFrame) -> Self {
        Self {
            join_ref,
            msg_ref,
            topic,
            event,
            payload,
        }
    }
}

impl From<Frame> for RawFrame {
    fn from(frame: Frame) -> Self {
        RawFrame(
            frame.join_ref,
            frame.msg_ref,
            frame.topic,
            frame.event,
            frame.payload,
        )
    }
}

impl Frame {
    pub fn new(
        join_ref: Option<String>,
        msg_ref: Option<String>,
        topic: impl Into<String>,
        event: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            join_ref,
            msg_ref,
            topic: topic.into(),
            event: event.into(),
            payload,
        }
    }

    pub fn heartbeat(msg_ref: String) -> Self {
        Self::new(
            None,
            Some(msg_ref),
            events::PHOENIX_TOPIC,
            events::HEARTBEAT,
            Payload::Object(Default::default()),
        )
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn is_reply(&self) -> bool {
        self.event == events::REPLY
    }

    /// `status` из `phx_reply` (`"ok"`, `"error"`, ...).
    pub fn reply_status(&self) -> Option<&str> {
        if !self.is_reply() {
            return None;
        }
        self.payload.get("status").and_then(|s| s.as_str())
    }
}
