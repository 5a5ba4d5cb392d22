use crate::config::ClientConfig;
use crate::connection::ServerConnection;
use crate::error::{PortalError, Result};
use crate::gate::Gate;
use crate::room::join_params::{CONTROL_TOPIC, control_params, room_params, room_topic};
use crate::transport::{Channel, Socket};
use parking_lot::Mutex;
use portal_core::{
    ConnectionState, ControlResponse, JoinOutcome, NetworkId, Payload, PermissionsToken, RoomInfo,
    RoomResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Канал, в который мы вошли.
struct JoinedChannel {
    channel: Arc<dyn Channel>,
    /// Сигнал приходит, когда канал закрылся (подтверждение leave) или упал.
    closed: Gate,
}

/// Участие в одной комнате поверх открытого `ServerConnection`.
///
/// Сначала вход в управляющий канал `ret`, затем в канал комнаты `hub:<id>`;
/// выход в обратном порядке. Родительское соединение заимствуется, поэтому
/// его нельзя закрыть, пока комната жива.
pub struct RoomSession<'a> {
    room_id: String,
    server: &'a ServerConnection,
    config: ClientConfig,
    state: ConnectionState,
    control: Option<JoinedChannel>,
    room: Option<JoinedChannel>,
    session_id: Option<String>,
    vapid_public_key: Option<String>,
    permissions_token: Option<PermissionsToken>,
    room_info: Option<RoomInfo>,
}

impl<'a> RoomSession<'a> {
    /// Войти в комнату с настройками родительского соединения и заданным именем.
    pub async fn open(
        room_id: impl Into<String>,
        server: &'a ServerConnection,
        display_name: &str,
    ) -> Result<Self> {
        let config = server.config().clone().with_display_name(display_name);
        Self::open_with_config(room_id, server, config).await
    }

    /// Имя участника и таймауты входа/выхода берутся из `config`.
    pub async fn open_with_config(
        room_id: impl Into<String>,
        server: &'a ServerConnection,
        config: ClientConfig,
    ) -> Result<Self> {
        let room_id = room_id.into();
        info!("RoomSession {} opening channel to room...", room_id);

        let Some(socket) = server.socket() else {
            return Err(PortalError::ServerNotOpen {
                url: server.server_url().to_string(),
                room_id,
                state: server.state(),
            });
        };

        let mut session = Self {
            room_id,
            server,
            config,
            state: ConnectionState::Closed,
            control: None,
            room: None,
            session_id: None,
            vapid_public_key: None,
            permissions_token: None,
            room_info: None,
        };
        session.set_state(ConnectionState::Opening);

        if let Err(e) = session.join_channels(&socket).await {
            error!("RoomSession {} failed to open: {}", session.room_id, e);
            for failure in session.leave_channels().await {
                warn!("RoomSession {} cleanup after failed open: {}", session.room_id, failure);
            }
            session.set_state(ConnectionState::Closed);
            return Err(e);
        }

        session.set_state(ConnectionState::Open);
        info!("RoomSession {} joined room", session.room_id);
        Ok(session)
    }

    /// Отправить событие в канал комнаты. Подтверждение не ждём.
    pub fn send(&self, event: &str, payload: Payload) -> Result<()> {
        let room = match (&self.room, self.state) {
            (Some(room), ConnectionState::Open) => room,
            _ => {
                return Err(PortalError::RoomNotOpen {
                    room_id: self.room_id.clone(),
                    state: self.state,
                });
            }
        };

        debug!("RoomSession {} pushing {}", self.room_id, event);
        room.channel.push(event, payload)
    }

    /// Выйти из канала комнаты, затем из управляющего канала.
    ///
    /// Ошибка одного шага не мешает следующему; после вызова состояние всегда CLOSED.
    pub async fn close(&mut self) -> Result<()> {
        if self.state.is_closed() && self.control.is_none() && self.room.is_none() {
            debug!("RoomSession {} already closed", self.room_id);
            return Ok(());
        }

        info!("Leaving room {}...", self.room_id);
        if !self.state.is_open() {
            warn!(
                "RoomSession {} closing room when state is {}",
                self.room_id, self.state
            );
        }
        self.set_state(ConnectionState::Closing);

        let failures = self.leave_channels().await;
        self.set_state(ConnectionState::Closed);

        if failures.is_empty() {
            info!("Left room {}", self.room_id);
            Ok(())
        } else {
            Err(PortalError::Teardown {
                room_id: self.room_id.clone(),
                failures,
            })
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn room_info(&self) -> Option<&RoomInfo> {
        self.room_info.as_ref()
    }

    pub fn permissions_token(&self) -> Option<&PermissionsToken> {
        self.permissions_token.as_ref()
    }

    pub fn display_name(&self) -> &str {
        &self.config.display_name
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid_public_key.as_deref()
    }

    fn set_state(&mut self, next: ConnectionState) {
        if !self.state.can_transition_to(next) {
            warn!(
                "RoomSession {} unexpected transition {} -> {}",
                self.room_id, self.state, next
            );
        }
        self.state = next;
    }

    async fn join_channels(&mut self, socket: &Arc<dyn Socket>) -> Result<()> {
        let params = control_params(&self.room_id);
        let (control, payload) = self.join_channel(socket, CONTROL_TOPIC, params).await?;
        self.control = Some(control);

        let response = self.require_response(CONTROL_TOPIC, payload)?;
        let control: ControlResponse =
            serde_json::from_value(response).map_err(|e| PortalError::InvalidResponse {
                room_id: self.room_id.clone(),
                topic: CONTROL_TOPIC.to_owned(),
                reason: e.to_string(),
            })?;
        info!("RoomSession {} sessionId = {}", self.room_id, control.session_id);
        self.session_id = Some(control.session_id);
        self.vapid_public_key = control.vapid_public_key;

        let topic = room_topic(&self.room_id);
        let params = room_params(
            &NetworkId::new(),
            &self.config.display_name,
            self.server.auth_token(),
        );
        let (room, payload) = self.join_channel(socket, &topic, params).await?;
        self.room = Some(room);

        let response = self.require_response(&topic, payload)?;
        let room: RoomResponse =
            serde_json::from_value(response).map_err(|e| PortalError::InvalidResponse {
                room_id: self.room_id.clone(),
                topic: topic.clone(),
                reason: e.to_string(),
            })?;
        self.absorb_room_response(room);

        Ok(())
    }

    async fn join_channel(
        &self,
        socket: &Arc<dyn Socket>,
        topic: &str,
        params: Payload,
    ) -> Result<(JoinedChannel, Payload)> {
        let channel = socket.channel(topic, params);
        let closed = Gate::new(format!("{} {} closed", self.room_id, topic));

        {
            let closed = closed.clone();
            let room_id = self.room_id.clone();
            let topic = topic.to_owned();
            channel.on_close(Box::new(move || {
                info!("RoomSession {} {} channel closed", room_id, topic);
                closed.try_signal();
            }));
        }
        {
            let closed = closed.clone();
            let room_id = self.room_id.clone();
            let topic = topic.to_owned();
            channel.on_error(Box::new(move |payload| {
                error!("RoomSession {} {} channel error: {}", room_id, topic, payload);
                closed.try_signal();
            }));
        }

        let joined = Gate::new(format!("{} {} join", self.room_id, topic));
        let outcome: Arc<Mutex<Option<JoinOutcome>>> = Arc::new(Mutex::new(None));

        let on_ok = {
            let joined = joined.clone();
            let closed = closed.clone();
            let outcome = outcome.clone();
            let room_id = self.room_id.clone();
            let topic = topic.to_owned();
            Box::new(move |payload: Payload| {
                info!("RoomSession {} {} channel joined", room_id, topic);
                closed.arm();
                *outcome.lock() = Some(Ok(payload));
                joined.signal();
            })
        };
        let on_error = {
            let joined = joined.clone();
            let outcome = outcome.clone();
            let room_id = self.room_id.clone();
            let topic = topic.to_owned();
            Box::new(move |payload: Payload| {
                error!("RoomSession {} {} channel join error: {}", room_id, topic, payload);
                *outcome.lock() = Some(Err(payload));
                joined.signal();
            })
        };

        channel
            .join(on_ok, on_error)
            .map_err(|e| PortalError::JoinFailed {
                room_id: self.room_id.clone(),
                topic: topic.to_owned(),
                reason: e.to_string(),
            })?;

        info!("RoomSession {} waiting to join {} channel...", self.room_id, topic);
        let signaled = joined.wait(self.config.join_timeout).await;
        let outcome = outcome.lock().take();

        match (signaled, outcome) {
            (true, Some(Ok(payload))) => Ok((JoinedChannel { channel, closed }, payload)),
            (true, Some(Err(reason))) => Err(PortalError::JoinFailed {
                room_id: self.room_id.clone(),
                topic: topic.to_owned(),
                reason: reason.to_string(),
            }),
            _ => {
                // Ответ может прийти позже: не оставляем за собой полуоткрытый канал.
                if let Err(e) = channel.leave() {
                    debug!(
                        "RoomSession {} {} leave after join timeout failed: {}",
                        self.room_id, topic, e
                    );
                }
                Err(PortalError::JoinFailed {
                    room_id: self.room_id.clone(),
                    topic: topic.to_owned(),
                    reason: "timeout".to_owned(),
                })
            }
        }
    }

    fn require_response(&self, topic: &str, mut payload: Payload) -> Result<Payload> {
        match payload.get_mut("response").map(Payload::take) {
            Some(response) if !response.is_null() => Ok(response),
            _ => Err(PortalError::MissingResponse {
                room_id: self.room_id.clone(),
                topic: topic.to_owned(),
            }),
        }
    }

    fn absorb_room_response(&mut self, response: RoomResponse) {
        if response.session_token.is_some() {
            debug!("RoomSession {} received session token", self.room_id);
        }

        if let Some(raw) = response.perms_token.as_deref() {
            let token = PermissionsToken::new(raw);
            match token.decode_body() {
                Ok(body) => info!("RoomSession {} permissions decoded: {}", self.room_id, body),
                Err(e) => warn!("RoomSession {} permissions token not decodable: {}", self.room_id, e),
            }
            self.permissions_token = Some(token);
        }

        self.room_info = match response.room_info() {
            Ok(Some(info)) => {
                info!(
                    "RoomSession {} hub info: {} ({}) entry mode {:?}",
                    self.room_id, info.name, info.slug, info.entry_mode
                );
                Some(info)
            }
            Ok(None) => {
                warn!("RoomSession {} response has no hubs info", self.room_id);
                None
            }
            Err(e) => {
                warn!(
                    "RoomSession {} hubs info not decodable: {}: {:?}",
                    self.room_id,
                    e,
                    response.hubs.first()
                );
                None
            }
        };
    }

    async fn leave_channels(&mut self) -> Vec<PortalError> {
        let timeout = self.config.leave_timeout;
        let mut failures = Vec::new();

        if let Some(room) = self.room.take() {
            let topic = room_topic(&self.room_id);
            if let Err(e) = leave_channel(&self.room_id, &topic, room, timeout).await {
                error!("RoomSession {} {}", self.room_id, e);
                failures.push(e);
            }
        }

        if let Some(control) = self.control.take() {
            if let Err(e) = leave_channel(&self.room_id, CONTROL_TOPIC, control, timeout).await {
                error!("RoomSession {} {}", self.room_id, e);
                failures.push(e);
            }
        }

        failures
    }
}

async fn leave_channel(
    room_id: &str,
    topic: &str,
    joined: JoinedChannel,
    timeout: Duration,
) -> Result<()> {
    if joined.closed.is_signaled() {
        debug!("RoomSession {} {} channel already closed", room_id, topic);
        return Ok(());
    }

    info!("RoomSession {} leaving {} channel...", room_id, topic);
    joined.channel.leave()?;

    if !joined.closed.wait(timeout).await {
        return Err(PortalError::LeaveTimeout {
            room_id: room_id.to_owned(),
            topic: topic.to_owned(),
        });
    }
    Ok(())
}

impl Drop for RoomSession<'_> {
    fn drop(&mut self) {
        if self.room.is_none() && self.control.is_none() {
            return;
        }

        warn!(
            "RoomSession {} not closed before drop, leaving without waiting",
            self.room_id
        );
        for joined in [self.room.take(), self.control.take()].into_iter().flatten() {
            if let Err(e) = joined.channel.leave() {
                debug!("RoomSession {} leave on drop failed: {}", self.room_id, e);
            }
        }
        self.state = ConnectionState::Closed;
    }
}
