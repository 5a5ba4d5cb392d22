pub mod lifecycle_tests;

use tracing::Level;
use url::Url;

use portal_client::{ClientConfig, Result, ServerConnection};

use crate::utils::{MockTransport, StaticResolver, TEST_SERVER};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Open a connection to the test server through the given fake transport.
pub async fn open_connection(transport: &MockTransport) -> Result<ServerConnection> {
    let resolver = StaticResolver::new("hub.example");
    ServerConnection::open(
        Url::parse(TEST_SERVER)?,
        "token-A",
        ClientConfig::default(),
        &resolver,
        transport,
    )
    .await
}
