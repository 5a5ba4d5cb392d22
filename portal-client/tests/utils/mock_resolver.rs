use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use portal_client::{MetadataResolver, PortalError, Result};
use portal_core::SocketMetadata;

/// Resolver that answers from memory and counts requests.
#[derive(Clone)]
pub struct StaticResolver {
    /// `None` makes every request fail with a 500 status.
    metadata: Option<SocketMetadata>,
    requests: Arc<AtomicUsize>,
}

impl StaticResolver {
    pub fn new(socket_host: impl Into<String>) -> Self {
        Self {
            metadata: Some(SocketMetadata {
                version: "1.0.20191126041226".into(),
                pool: "earth".into(),
                socket_host: socket_host.into(),
                socket_port: Some("4000".into()),
            }),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            metadata: None,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataResolver for StaticResolver {
    async fn resolve(&self, server_url: &Url) -> Result<SocketMetadata> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.metadata {
            Some(metadata) => Ok(metadata.clone()),
            None => Err(PortalError::MetadataStatus {
                url: server_url.join("api/v1/meta")?.to_string(),
                status: 500,
            }),
        }
    }
}
