use portal_core::ConnectionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("metadata request to {url} returned status {status}")]
    MetadataStatus { url: String, status: u16 },

    #[error("metadata response from {url} has no body")]
    EmptyMetadata { url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("timeout when connecting to server {url}")]
    ConnectTimeout { url: String },

    #[error("failed to connect to server {url}")]
    ConnectFailed { url: String },

    #[error("server {url} is not open for room {room_id} (state {state})")]
    ServerNotOpen {
        url: String,
        room_id: String,
        state: ConnectionState,
    },

    #[error("failed to join {topic} channel for room {room_id}: {reason}")]
    JoinFailed {
        room_id: String,
        topic: String,
        reason: String,
    },

    #[error("no {topic} response for room {room_id}")]
    MissingResponse { room_id: String, topic: String },

    #[error("invalid {topic} response for room {room_id}: {reason}")]
    InvalidResponse {
        room_id: String,
        topic: String,
        reason: String,
    },

    #[error("room {room_id} is not open (state {state})")]
    RoomNotOpen {
        room_id: String,
        state: ConnectionState,
    },

    #[error("failed to leave {topic} channel for room {room_id}")]
    LeaveTimeout { room_id: String, topic: String },

    #[error("{} teardown step(s) failed for room {room_id}", .failures.len())]
    Teardown {
        room_id: String,
        failures: Vec<PortalError>,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, PortalError>;
