use crate::config::ClientConfig;
use crate::error::{PortalError, Result};
use crate::gate::Gate;
use crate::metadata::MetadataResolver;
use crate::transport::{Socket, Transport};
use parking_lot::Mutex;
use portal_core::{ConnectionState, SocketMetadata};
use std::sync::{Arc, Weak};
use tracing::{error, info, warn};
use url::Url;

const CLOSE_REASON: &str = "Client is closing";

/// Состояние, которое меняют колбэки транспорта.
#[derive(Default)]
struct ConnectionShared {
    state: Mutex<ConnectionState>,
    socket: Mutex<Option<Arc<dyn Socket>>>,
}

impl ConnectionShared {
    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn set_state(&self, url: &Url, next: ConnectionState) {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            warn!("ServerConnection {} unexpected transition {} -> {}", url, *state, next);
        }
        *state = next;
    }

    fn socket(&self) -> Option<Arc<dyn Socket>> {
        self.socket.lock().clone()
    }

    fn take_socket(&self) -> Option<Arc<dyn Socket>> {
        self.socket.lock().take()
    }
}

/// Одно сокетное соединение с одним сервером.
///
/// Создание блокирует (асинхронно) до открытия сокета или окончательной ошибки.
/// Пока соединение OPEN, только оно владеет сокетом; комнаты берут у него каналы.
pub struct ServerConnection {
    server_url: Url,
    auth_token: String,
    config: ClientConfig,
    metadata: SocketMetadata,
    shared: Arc<ConnectionShared>,
}

impl ServerConnection {
    pub async fn open(
        server_url: Url,
        auth_token: impl Into<String>,
        config: ClientConfig,
        resolver: &dyn MetadataResolver,
        transport: &dyn Transport,
    ) -> Result<Self> {
        info!("ServerConnection {} connecting...", server_url);

        let metadata = resolver.resolve(&server_url).await?;
        info!("ServerConnection {} metadata: {}", server_url, metadata);

        let endpoint = socket_endpoint(&server_url, &metadata, &config)?;
        let shared = Arc::new(ConnectionShared::default());
        let gate = Gate::new(format!("connect {server_url}"));

        let socket = transport.socket(&endpoint);
        register_callbacks(&socket, &shared, &gate, &server_url);

        // До connect(): фейковый транспорт может вызвать on_open синхронно.
        shared.set_state(&server_url, ConnectionState::Opening);
        info!(
            "ServerConnection {} connecting at endpoint {}",
            server_url,
            socket.endpoint()
        );
        socket.connect();

        info!("ServerConnection {} waiting for socket connection...", server_url);
        if !gate.wait(config.connect_timeout).await {
            error!("ServerConnection {} connection timeout", server_url);
            abandon(&socket, &shared, &server_url);
            return Err(PortalError::ConnectTimeout {
                url: server_url.to_string(),
            });
        }

        if shared.socket().is_none() {
            error!("ServerConnection {} connection failed", server_url);
            abandon(&socket, &shared, &server_url);
            return Err(PortalError::ConnectFailed {
                url: server_url.to_string(),
            });
        }

        info!("ServerConnection {} socket connected", server_url);
        Ok(Self {
            server_url,
            auth_token: auth_token.into(),
            config,
            metadata,
            shared,
        })
    }

    /// Закрыть сокет, не дожидаясь подтверждения. Повторный вызов ничего не делает.
    pub fn close(&mut self) {
        let Some(socket) = self.shared.take_socket() else {
            if !self.shared.state().is_closed() {
                self.shared.set_state(&self.server_url, ConnectionState::Closed);
            }
            return;
        };

        info!("ServerConnection {} closing...", self.server_url);
        self.shared.set_state(&self.server_url, ConnectionState::Closing);
        socket.disconnect(CLOSE_REASON);
        self.shared.set_state(&self.server_url, ConnectionState::Closed);
        info!("ServerConnection {} closed", self.server_url);
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn metadata(&self) -> &SocketMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `<server>/api/v1/media`; путь сервера, если он есть, сохраняется.
    pub fn media_url(&self) -> Result<Url> {
        media_endpoint(&self.server_url)
    }

    /// Живой сокет, только пока соединение OPEN.
    pub(crate) fn socket(&self) -> Option<Arc<dyn Socket>> {
        if !self.state().is_open() {
            return None;
        }
        self.shared.socket()
    }
}

impl Drop for ServerConnection {
    fn drop(&mut self) {
        if self.shared.socket().is_some() {
            warn!(
                "ServerConnection {} not closed before drop, closing now",
                self.server_url
            );
            self.close();
        }
    }
}

fn register_callbacks(
    socket: &Arc<dyn Socket>,
    shared: &Arc<ConnectionShared>,
    gate: &Gate,
    server_url: &Url,
) {
    // Weak: колбэки живут внутри сокета и не должны держать его сами.
    let handle: Weak<dyn Socket> = Arc::downgrade(socket);

    {
        let shared = shared.clone();
        let gate = gate.clone();
        let url = server_url.clone();
        socket.on_open(Box::new(move || {
            info!("ServerConnection {} socket opened", url);
            let Some(socket) = handle.upgrade() else {
                warn!("ServerConnection {} socket opened after it was dropped", url);
                return;
            };
            {
                let mut current = shared.socket.lock();
                if current.is_some() {
                    warn!("ServerConnection {} unexpected second open", url);
                    return;
                }
                let state = shared.state();
                if state != ConnectionState::Opening {
                    warn!("ServerConnection {} socket opened in state {}", url, state);
                    return;
                }
                *current = Some(socket);
            }
            shared.set_state(&url, ConnectionState::Open);
            gate.signal();
        }));
    }

    {
        let shared = shared.clone();
        let gate = gate.clone();
        let url = server_url.clone();
        socket.on_close(Box::new(move || {
            info!("ServerConnection {} socket closed", url);
            shared.take_socket();
            shared.set_state(&url, ConnectionState::Closed);
            gate.try_signal();
        }));
    }

    {
        let shared = shared.clone();
        let gate = gate.clone();
        let url = server_url.clone();
        socket.on_error(Box::new(move |reason| {
            error!("ServerConnection {} socket error: {}", url, reason);
            shared.set_state(&url, ConnectionState::Closed);
            gate.try_signal();
        }));
    }
}

/// Неудачное открытие: сокет закрывается и не остаётся в состоянии.
fn abandon(socket: &Arc<dyn Socket>, shared: &ConnectionShared, server_url: &Url) {
    shared.take_socket();
    socket.disconnect(CLOSE_REASON);
    shared.set_state(server_url, ConnectionState::Closed);
}

fn media_endpoint(server_url: &Url) -> Result<Url> {
    let base = server_url.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/api/v1/media"))?)
}

/// `wss://<phx_host><socket_path>`, для `http://` серверов `ws://`.
fn socket_endpoint(
    server_url: &Url,
    metadata: &SocketMetadata,
    config: &ClientConfig,
) -> Result<Url> {
    let scheme = match server_url.scheme() {
        "http" | "ws" => "ws",
        _ => "wss",
    };
    Ok(Url::parse(&format!(
        "{}://{}{}",
        scheme, metadata.socket_host, config.socket_path
    ))?)
}
