pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod gate;
pub mod metadata;
pub mod room;
pub mod transport;

pub use api::{Portal, send_message};
pub use config::ClientConfig;
pub use connection::ServerConnection;
pub use error::{PortalError, Result};
pub use gate::Gate;
pub use metadata::{HttpMetadataResolver, MetadataResolver};
pub use room::RoomSession;
