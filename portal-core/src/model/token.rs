use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has no body segment")]
    Malformed,

    #[error("token body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// JWT с правами участника, выданный сервером при входе в комнату.
///
/// Подпись не проверяется, содержимое тела не интерпретируется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionsToken(String);

impl PermissionsToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Декодировать тело (`<header>.<body>.<signature>`) как JSON.
    pub fn decode_body(&self) -> Result<serde_json::Value, TokenError> {
        let body = self.0.split('.').nth(1).ok_or(TokenError::Malformed)?;
        let bytes = URL_SAFE_NO_PAD.decode(body.trim_end_matches('='))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
