use serde::{Deserialize, Serialize};
use std::fmt;

/// Состояние соединения с сервером или комнатой.
///
/// Closed -> Opening -> Open -> Closing -> Closed. Из Opening и Open можно
/// сразу упасть в Closed (ошибка открытия, обрыв сокета).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }

    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }

    /// Разрешён ли переход `self -> next`. Переход в то же состояние считается допустимым.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Closed, Opening)
                | (Opening, Open)
                | (Opening, Closed)
                | (Open, Closing)
                | (Open, Closed)
                | (Closing, Closed)
        ) || self == next
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "CLOSED",
            Self::Opening => "OPENING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
        };
        f.write_str(name)
    }
}
