mod phoenix_channel;
mod phoenix_socket;
mod transport_traits;

pub use phoenix_channel::PhoenixChannel;
pub use phoenix_socket::{PROTOCOL_VSN, PhoenixSocket, PhoenixTransport};
pub use transport_traits::*;
