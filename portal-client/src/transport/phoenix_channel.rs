use crate::error::Result;
use crate::transport::phoenix_socket::{PendingReply, SocketShared};
use crate::transport::transport_traits::{
    Channel, ChannelErrorCallback, CloseCallback, ReplyCallback,
};
use parking_lot::Mutex;
use portal_core::{Frame, Payload, events};
use std::sync::Arc;
use tracing::debug;

/// Состояние канала, на которое ссылается и сокет (для маршрутизации), и сам канал.
pub(crate) struct ChannelShared {
    pub(crate) topic: String,
    params: Payload,
    join_ref: Mutex<Option<String>>,
    on_close: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
    on_error: Mutex<Option<Arc<dyn Fn(Payload) + Send + Sync>>>,
}

impl ChannelShared {
    pub(crate) fn new(topic: &str, params: Payload) -> Self {
        Self {
            topic: topic.to_owned(),
            params,
            join_ref: Mutex::new(None),
            on_close: Mutex::new(None),
            on_error: Mutex::new(None),
        }
    }

    /// Сообщения от прошлых join (другой join_ref) игнорируются.
    pub(crate) fn accepts(&self, join_ref: Option<&str>) -> bool {
        match (join_ref, self.join_ref.lock().as_deref()) {
            (Some(incoming), Some(current)) => incoming == current,
            _ => true,
        }
    }

    pub(crate) fn fire_close(&self) {
        let callback = self.on_close.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    pub(crate) fn fire_error(&self, payload: Payload) {
        let callback = self.on_error.lock().clone();
        if let Some(callback) = callback {
            callback(payload);
        }
    }

    fn join_ref(&self) -> Option<String> {
        self.join_ref.lock().clone()
    }
}

pub struct PhoenixChannel {
    shared: Arc<ChannelShared>,
    socket: Arc<SocketShared>,
}

impl PhoenixChannel {
    pub(crate) fn new(shared: Arc<ChannelShared>, socket: Arc<SocketShared>) -> Self {
        Self { shared, socket }
    }

    fn send_tracked(&self, msg_ref: String, frame: Frame, pending: PendingReply) -> Result<()> {
        self.socket.pending.insert(msg_ref.clone(), pending);
        if let Err(e) = self.socket.send(frame) {
            self.socket.pending.remove(&msg_ref);
            return Err(e);
        }
        Ok(())
    }
}

impl Channel for PhoenixChannel {
    fn topic(&self) -> &str {
        &self.shared.topic
    }

    fn on_close(&self, callback: CloseCallback) {
        *self.shared.on_close.lock() = Some(Arc::from(callback));
    }

    fn on_error(&self, callback: ChannelErrorCallback) {
        *self.shared.on_error.lock() = Some(Arc::from(callback));
    }

    fn join(&self, on_ok: ReplyCallback, on_error: ReplyCallback) -> Result<()> {
        let join_ref = self.socket.make_ref();
        *self.shared.join_ref.lock() = Some(join_ref.clone());

        debug!("Phoenix channel {} joining with ref {}", self.shared.topic, join_ref);
        let frame = Frame::new(
            Some(join_ref.clone()),
            Some(join_ref.clone()),
            self.shared.topic.as_str(),
            events::JOIN,
            self.shared.params.clone(),
        );
        self.send_tracked(join_ref, frame, PendingReply::Join { on_ok, on_error })
    }

    fn leave(&self) -> Result<()> {
        let msg_ref = self.socket.make_ref();

        debug!("Phoenix channel {} leaving with ref {}", self.shared.topic, msg_ref);
        let frame = Frame::new(
            self.shared.join_ref(),
            Some(msg_ref.clone()),
            self.shared.topic.as_str(),
            events::LEAVE,
            Payload::Object(Default::default()),
        );
        self.send_tracked(msg_ref, frame, PendingReply::Leave(self.shared.clone()))
    }

    fn push(&self, event: &str, payload: Payload) -> Result<()> {
        let frame = Frame::new(
            self.shared.join_ref(),
            Some(self.socket.make_ref()),
            self.shared.topic.as_str(),
            event,
            payload,
        );
        self.socket.send(frame)
    }
}
