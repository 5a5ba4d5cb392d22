use crate::error::Result;
use portal_core::Payload;
use std::sync::Arc;
use url::Url;

pub type OpenCallback = Box<dyn Fn() + Send + Sync>;
pub type CloseCallback = Box<dyn Fn() + Send + Sync>;
pub type SocketErrorCallback = Box<dyn Fn(String) + Send + Sync>;
pub type ChannelErrorCallback = Box<dyn Fn(Payload) + Send + Sync>;
/// Вызывается ровно один раз на одну попытку входа.
pub type ReplyCallback = Box<dyn FnOnce(Payload) + Send + Sync>;

/// Фабрика сокетов. Реализацию по умолчанию даёт `PhoenixTransport`,
/// в тестах её подменяют фейком.
pub trait Transport: Send + Sync {
    fn socket(&self, endpoint: &Url) -> Arc<dyn Socket>;
}

/// Сокетная сессия: одно WebSocket-соединение, мультиплексирующее все каналы.
///
/// Колбэки регистрируются до `connect()` и могут вызываться из любого потока,
/// в том числе синхронно внутри `connect()`.
pub trait Socket: Send + Sync {
    fn endpoint(&self) -> &Url;

    fn on_open(&self, callback: OpenCallback);

    fn on_close(&self, callback: CloseCallback);

    fn on_error(&self, callback: SocketErrorCallback);

    /// Начать подключение. Результат приходит через колбэки.
    fn connect(&self);

    fn disconnect(&self, reason: &str);

    fn channel(&self, topic: &str, params: Payload) -> Arc<dyn Channel>;
}

/// Канал на сокете со своим жизненным циклом join/leave.
pub trait Channel: Send + Sync {
    fn topic(&self) -> &str;

    fn on_close(&self, callback: CloseCallback);

    fn on_error(&self, callback: ChannelErrorCallback);

    /// Отправить `phx_join`. Ответ придёт в `on_ok` или `on_error`.
    fn join(&self, on_ok: ReplyCallback, on_error: ReplyCallback) -> Result<()>;

    /// Отправить `phx_leave`. Подтверждение приходит через `on_close`.
    fn leave(&self) -> Result<()>;

    /// Отправить событие без ожидания ответа.
    fn push(&self, event: &str, payload: Payload) -> Result<()>;
}
