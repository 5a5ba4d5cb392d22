use std::time::Duration;

/// Настройки клиента: таймауты ожидания, пути на сервере, имя участника по умолчанию.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Сколько ждать открытия сокета.
    pub connect_timeout: Duration,
    /// Сколько ждать ответа на вход в канал.
    pub join_timeout: Duration,
    /// Сколько ждать подтверждения выхода из канала.
    pub leave_timeout: Duration,
    pub heartbeat_interval: Duration,
    /// Таймаут HTTP-запроса метаданных.
    pub http_timeout: Duration,
    /// Путь метаданных относительно адреса сервера.
    pub metadata_path: String,
    pub socket_path: String,
    pub display_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(10),
            leave_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(30),
            metadata_path: "api/v1/meta".to_owned(),
            socket_path: "/socket/websocket".to_owned(),
            display_name: "portal-agent".to_owned(),
        }
    }
}

impl ClientConfig {
    /// Один и тот же таймаут для открытия, входа и выхода.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.join_timeout = timeout;
        self.leave_timeout = timeout;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}
