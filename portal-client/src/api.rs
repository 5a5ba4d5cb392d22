use crate::config::ClientConfig;
use crate::connection::ServerConnection;
use crate::error::Result;
use crate::metadata::{HttpMetadataResolver, MetadataResolver};
use crate::room::RoomSession;
use crate::transport::{PhoenixTransport, Transport};
use portal_core::Payload;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Точка входа клиента: настройки плюс способы найти сокет и подключиться к нему.
pub struct Portal {
    config: ClientConfig,
    resolver: Arc<dyn MetadataResolver>,
    transport: Arc<dyn Transport>,
}

impl Portal {
    pub fn new(config: ClientConfig) -> Self {
        let resolver = Arc::new(HttpMetadataResolver::new(&config));
        let transport = Arc::new(PhoenixTransport::from_config(&config));
        Self::with_parts(config, resolver, transport)
    }

    pub fn with_parts(
        config: ClientConfig,
        resolver: Arc<dyn MetadataResolver>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            resolver,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn connect(&self, server_url: &Url, auth_token: &str) -> Result<ServerConnection> {
        ServerConnection::open(
            server_url.clone(),
            auth_token,
            self.config.clone(),
            self.resolver.as_ref(),
            self.transport.as_ref(),
        )
        .await
    }

    /// Подключиться, войти в комнату, отправить одно событие и всё закрыть.
    ///
    /// Комната и соединение закрываются на любом пути выхода. Первая ошибка
    /// (отправки или закрытия комнаты) возвращается вызывающему.
    pub async fn send_message(
        &self,
        server_url: &Url,
        auth_token: &str,
        room_id: &str,
        event: &str,
        payload: Payload,
    ) -> Result<()> {
        let mut connection = self.connect(server_url, auth_token).await?;

        let result = async {
            let mut room =
                RoomSession::open_with_config(room_id, &connection, self.config.clone()).await?;
            let sent = room.send(event, payload);
            let closed = room.close().await;
            sent.and(closed)
        }
        .await;

        connection.close();
        if result.is_ok() {
            info!("Sent {} to room {} on {}", event, room_id, server_url);
        }
        result
    }
}

/// Отправить одно событие в комнату с настройками по умолчанию.
pub async fn send_message(
    server_url: &str,
    auth_token: &str,
    room_id: &str,
    event: &str,
    payload: Payload,
    agent_name: &str,
) -> Result<()> {
    let server_url = Url::parse(server_url)?;
    let config = ClientConfig::default().with_display_name(agent_name);
    Portal::new(config)
        .send_message(&server_url, auth_token, room_id, event, payload)
        .await
}
