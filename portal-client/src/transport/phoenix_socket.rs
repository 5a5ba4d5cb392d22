use crate::config::ClientConfig;
use crate::error::{PortalError, Result};
use crate::transport::phoenix_channel::{ChannelShared, PhoenixChannel};
use crate::transport::transport_traits::{
    Channel, CloseCallback, OpenCallback, ReplyCallback, Socket, SocketErrorCallback, Transport,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use portal_core::{Frame, Payload, events};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, warn};
use url::Url;

/// Версия сериализатора Phoenix (массивы `[join_ref, ref, topic, event, payload]`).
pub const PROTOCOL_VSN: &str = "2.0.0";

/// Транспорт по умолчанию: Phoenix Channels V2 JSON поверх tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct PhoenixTransport {
    heartbeat_interval: Duration,
}

impl PhoenixTransport {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self { heartbeat_interval }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.heartbeat_interval)
    }
}

impl Default for PhoenixTransport {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl Transport for PhoenixTransport {
    fn socket(&self, endpoint: &Url) -> Arc<dyn Socket> {
        Arc::new(PhoenixSocket::new(
            with_protocol_version(endpoint),
            self.heartbeat_interval,
        ))
    }
}

fn with_protocol_version(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    if !url.query_pairs().any(|(key, _)| key == "vsn") {
        url.query_pairs_mut().append_pair("vsn", PROTOCOL_VSN);
    }
    url
}

pub(crate) enum Outbound {
    Frame(Frame),
    Close(String),
}

/// Кто ждёт `phx_reply` с данным ref.
pub(crate) enum PendingReply {
    Join {
        on_ok: ReplyCallback,
        on_error: ReplyCallback,
    },
    Leave(Arc<ChannelShared>),
    Heartbeat,
}

/// Состояние сокета, общее для задачи чтения/записи и для каналов.
pub(crate) struct SocketShared {
    next_ref: AtomicU64,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    pub(crate) pending: DashMap<String, PendingReply>,
    channels: DashMap<String, Arc<ChannelShared>>,
    disconnected: AtomicBool,
    on_open: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    on_close: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    on_error: Mutex<Option<Arc<dyn Fn(String) + Send + Sync>>>,
}

impl SocketShared {
    fn new() -> Self {
        Self {
            next_ref: AtomicU64::new(0),
            outbound: Mutex::new(None),
            pending: DashMap::new(),
            channels: DashMap::new(),
            disconnected: AtomicBool::new(false),
            on_open: Mutex::new(None),
            on_close: Mutex::new(None),
            on_error: Mutex::new(None),
        }
    }

    pub(crate) fn make_ref(&self) -> String {
        (self.next_ref.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    pub(crate) fn send(&self, frame: Frame) -> Result<()> {
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(PortalError::Transport(format!(
                "socket is not connected, dropping {} {}",
                frame.topic, frame.event
            )));
        };
        tx.send(Outbound::Frame(frame))
            .map_err(|_| PortalError::Transport("socket writer has stopped".to_owned()))
    }

    /// Следующий heartbeat. `None`, если сервер так и не ответил на предыдущий:
    /// такой сокет считается мёртвым.
    fn next_heartbeat(&self, previous: Option<&str>) -> Option<Frame> {
        if let Some(previous) = previous {
            if self.pending.remove(previous).is_some() {
                return None;
            }
        }
        let msg_ref = self.make_ref();
        self.pending.insert(msg_ref.clone(), PendingReply::Heartbeat);
        Some(Frame::heartbeat(msg_ref))
    }

    fn fire_open(&self) {
        let callback = self.on_open.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn fire_close(&self) {
        let callback = self.on_close.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn fire_error(&self, reason: String) {
        let callback = self.on_error.lock().clone();
        if let Some(callback) = callback {
            callback(reason);
        }
    }

    /// Разобрать входящий фрейм и отдать его ожидающему ответу или каналу.
    fn dispatch(&self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Phoenix socket received undecodable frame ({}): {}", e, text);
                return;
            }
        };

        if frame.is_reply() {
            let pending = frame
                .msg_ref
                .as_ref()
                .and_then(|msg_ref| self.pending.remove(msg_ref))
                .map(|(_, pending)| pending);

            match pending {
                Some(pending) => self.resolve_reply(pending, frame),
                None => debug!(
                    "Phoenix socket reply for unknown ref {:?} on {}",
                    frame.msg_ref, frame.topic
                ),
            }
            return;
        }

        let channel = self
            .channels
            .get(&frame.topic)
            .map(|entry| entry.value().clone());
        let Some(channel) = channel else {
            debug!(
                "Phoenix socket event {} for unknown topic {}",
                frame.event, frame.topic
            );
            return;
        };

        if !channel.accepts(frame.join_ref.as_deref()) {
            debug!(
                "Phoenix channel {} dropping {} from stale join {:?}",
                frame.topic, frame.event, frame.join_ref
            );
            return;
        }

        match frame.event.as_str() {
            events::CLOSE => {
                self.forget_channel(&channel);
                channel.fire_close();
            }
            events::ERROR => channel.fire_error(frame.payload),
            other => debug!("Phoenix channel {} event {} ignored", frame.topic, other),
        }
    }

    fn resolve_reply(&self, pending: PendingReply, frame: Frame) {
        let ok = frame.reply_status() == Some("ok");

        match pending {
            PendingReply::Join { on_ok, on_error } => {
                if ok {
                    on_ok(frame.payload);
                } else {
                    on_error(frame.payload);
                }
            }
            PendingReply::Leave(channel) => {
                if !ok {
                    warn!(
                        "Phoenix channel {} leave answered with {:?}",
                        channel.topic,
                        frame.reply_status()
                    );
                }
                self.forget_channel(&channel);
                channel.fire_close();
            }
            PendingReply::Heartbeat => {
                if !ok {
                    warn!("Phoenix heartbeat answered with {:?}", frame.reply_status());
                }
            }
        }
    }

    fn forget_channel(&self, channel: &Arc<ChannelShared>) {
        self.channels
            .remove_if(&channel.topic, |_, current| Arc::ptr_eq(current, channel));
    }

    /// Сокет закрылся: отказать всем ожидающим ответам и всем каналам.
    fn fail_all(&self, reason: &str) {
        let refs: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for msg_ref in refs {
            let Some((_, pending)) = self.pending.remove(&msg_ref) else {
                continue;
            };
            match pending {
                PendingReply::Join { on_error, .. } => on_error(json!({ "reason": reason })),
                PendingReply::Leave(channel) => channel.fire_close(),
                PendingReply::Heartbeat => {}
            }
        }

        let channels: Vec<Arc<ChannelShared>> =
            self.channels.iter().map(|e| e.value().clone()).collect();
        self.channels.clear();
        for channel in channels {
            channel.fire_error(json!({ "reason": reason }));
        }
    }
}

pub struct PhoenixSocket {
    endpoint: Url,
    heartbeat_interval: Duration,
    started: AtomicBool,
    shared: Arc<SocketShared>,
}

impl PhoenixSocket {
    pub fn new(endpoint: Url, heartbeat_interval: Duration) -> Self {
        Self {
            endpoint,
            heartbeat_interval,
            started: AtomicBool::new(false),
            shared: Arc::new(SocketShared::new()),
        }
    }
}

impl Socket for PhoenixSocket {
    fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn on_open(&self, callback: OpenCallback) {
        *self.shared.on_open.lock() = Some(Arc::from(callback));
    }

    fn on_close(&self, callback: CloseCallback) {
        *self.shared.on_close.lock() = Some(Arc::from(callback));
    }

    fn on_error(&self, callback: SocketErrorCallback) {
        *self.shared.on_error.lock() = Some(Arc::from(callback));
    }

    fn connect(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Phoenix socket {} connect called twice", self.endpoint);
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.outbound.lock() = Some(tx);

        info!("Phoenix socket connecting at endpoint {}", self.endpoint);
        tokio::spawn(run_socket(
            self.shared.clone(),
            self.endpoint.clone(),
            rx,
            self.heartbeat_interval,
        ));
    }

    fn disconnect(&self, reason: &str) {
        self.shared.disconnected.store(true, Ordering::SeqCst);

        let Some(tx) = self.shared.outbound.lock().take() else {
            debug!("Phoenix socket {} already disconnected", self.endpoint);
            return;
        };
        let _ = tx.send(Outbound::Close(reason.to_owned()));
    }

    fn channel(&self, topic: &str, params: Payload) -> Arc<dyn Channel> {
        let channel = Arc::new(ChannelShared::new(topic, params));
        if self
            .shared
            .channels
            .insert(topic.to_owned(), channel.clone())
            .is_some()
        {
            warn!("Phoenix channel {} replaced an existing channel", topic);
        }
        Arc::new(PhoenixChannel::new(channel, self.shared.clone()))
    }
}

impl Drop for PhoenixSocket {
    fn drop(&mut self) {
        // Задача чтения/записи завершится, когда увидит закрытый канал исходящих.
        self.shared.outbound.lock().take();
    }
}

async fn run_socket(
    shared: Arc<SocketShared>,
    endpoint: Url,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    heartbeat_interval: Duration,
) {
    let mut stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            error!("Phoenix socket {} connect failed: {}", endpoint, e);
            shared.outbound.lock().take();
            shared.fire_error(e.to_string());
            return;
        }
    };

    if shared.disconnected.load(Ordering::SeqCst) {
        debug!("Phoenix socket {} disconnected while connecting", endpoint);
        let _ = stream.close(None).await;
        return;
    }

    info!("Phoenix socket {} opened", endpoint);
    shared.fire_open();

    let (mut write, mut read) = stream.split();
    let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
    let mut failure: Option<String> = None;
    let mut last_heartbeat: Option<String> = None;

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => match outbound {
                Some(Outbound::Frame(frame)) => {
                    let text = match frame.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode frame for {}: {}", frame.topic, e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        failure = Some(e.to_string());
                        break;
                    }
                }
                Some(Outbound::Close(reason)) => {
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: reason.into(),
                    };
                    if let Err(e) = write.send(Message::Close(Some(close))).await {
                        debug!("Phoenix socket {} close frame not sent: {}", endpoint, e);
                    }
                    break;
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },

            _ = heartbeat.tick() => {
                let Some(frame) = shared.next_heartbeat(last_heartbeat.as_deref()) else {
                    failure = Some("heartbeat timeout".to_owned());
                    break;
                };
                last_heartbeat = frame.msg_ref.clone();
                match frame.encode() {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            failure = Some(e.to_string());
                            break;
                        }
                    }
                    Err(e) => error!("Failed to encode heartbeat: {}", e),
                }
            }

            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                Some(Ok(Message::Close(frame))) => {
                    info!("Phoenix socket {} closed by server: {:?}", endpoint, frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    failure = Some(e.to_string());
                    break;
                }
                None => break,
            },
        }
    }

    shared.outbound.lock().take();
    shared.fail_all("socket closed");

    if let Some(reason) = failure {
        error!("Phoenix socket {} error: {}", endpoint, reason);
        shared.fire_error(reason);
    }

    info!("Phoenix socket {} closed", endpoint);
    shared.fire_close();
}
