use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// Одноразовый "шлюз": превращает одно терминальное событие из колбэка
/// транспорта в ожидание с ограничением по времени.
///
/// `signal()` можно звать из любого потока и до начала ожидания: событие не теряется.
/// Повторный сигнал в том же цикле игнорируется и пишется в лог как нарушение протокола.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<GateInner>,
}

struct GateInner {
    label: String,
    signaled: watch::Sender<bool>,
}

impl Gate {
    pub fn new(label: impl Into<String>) -> Self {
        let (signaled, _) = watch::channel(false);
        Self {
            inner: Arc::new(GateInner {
                label: label.into(),
                signaled,
            }),
        }
    }

    /// Сбросить в состояние "сигнала ещё не было".
    pub fn arm(&self) {
        self.inner.signaled.send_replace(false);
    }

    /// Возвращает `false`, если в этом цикле сигнал уже был.
    pub fn signal(&self) -> bool {
        let first = self.try_signal();
        if !first {
            warn!("Gate '{}' signaled more than once", self.inner.label);
        }
        first
    }

    /// Как `signal()`, но повторный вызов не считается нарушением и не логируется.
    pub fn try_signal(&self) -> bool {
        self.inner.signaled.send_if_modified(|signaled| {
            if *signaled {
                false
            } else {
                *signaled = true;
                true
            }
        })
    }

    pub fn is_signaled(&self) -> bool {
        *self.inner.signaled.borrow()
    }

    /// Ждать сигнала не дольше `timeout`. `true` если сигнал пришёл вовремя.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.inner.signaled.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|signaled| *signaled)).await,
            Ok(Ok(_))
        )
    }
}
