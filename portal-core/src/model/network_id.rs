use serde::{Deserialize, Serialize};
use std::fmt;

/// Случайный 7-символьный идентификатор участника (`avatarId` в профиле).
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct NetworkId(pub String);

impl NetworkId {
    pub const LEN: usize = 7;

    pub fn new() -> Self {
        Self::from_u64(rand::random())
    }

    /// base36 от `n`, дополненный нулями слева до 7 символов и обрезанный до 7.
    pub fn from_u64(n: u64) -> Self {
        let digits = to_base36(n);
        let padded = format!("{:0>width$}", digits, width = Self::LEN);
        Self(padded[..Self::LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut n: u64) -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while n > 0 {
        out.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
