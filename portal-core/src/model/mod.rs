mod frame;
mod metadata;
mod network_id;
mod room;
mod state;
mod token;

pub use frame::{Frame, events};
pub use metadata::SocketMetadata;
pub use network_id::NetworkId;
pub use room::{ControlResponse, JoinOutcome, RoomInfo, RoomResponse};
pub use state::ConnectionState;
pub use token::{PermissionsToken, TokenError};

/// Произвольный JSON, который передаётся в канал и приходит из него.
pub type Payload = serde_json::Value;
