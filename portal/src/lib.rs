pub use portal_core::model::{ConnectionState, NetworkId};

pub mod model {
    pub use portal_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use portal_client::*;
}

#[cfg(feature = "client")]
pub use portal_client::{ClientConfig, Portal, PortalError, send_message};
