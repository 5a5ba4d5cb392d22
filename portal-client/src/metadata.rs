use crate::config::ClientConfig;
use crate::error::{PortalError, Result};
use async_trait::async_trait;
use portal_core::SocketMetadata;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

/// Общий на весь процесс HTTP-клиент: создаётся один раз и живёт до конца процесса,
/// держит только пул соединений.
static HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

pub fn shared_http_client() -> Client {
    HTTP_CLIENT.clone()
}

/// Узнать по адресу сервера, где находится его сокет.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, server_url: &Url) -> Result<SocketMetadata>;
}

pub struct HttpMetadataResolver {
    client: Client,
    metadata_path: String,
    timeout: Duration,
}

impl HttpMetadataResolver {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(shared_http_client(), config)
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            metadata_path: config.metadata_path.clone(),
            timeout: config.http_timeout,
        }
    }

    pub fn metadata_url(&self, server_url: &Url) -> Result<Url> {
        Ok(server_url.join(&self.metadata_path)?)
    }
}

#[async_trait]
impl MetadataResolver for HttpMetadataResolver {
    async fn resolve(&self, server_url: &Url) -> Result<SocketMetadata> {
        let url = self.metadata_url(server_url)?;
        debug!("Requesting metadata from {}", url);

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Metadata request to {} returned {}", url, status);
            return Err(PortalError::MetadataStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            error!("Unexpected empty response body from {}", url);
            return Err(PortalError::EmptyMetadata {
                url: url.to_string(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
