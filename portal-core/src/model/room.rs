use crate::model::Payload;
use serde::{Deserialize, Deserializer, Serialize};

/// Результат одной попытки входа в канал: payload ответа `ok` или причина отказа.
pub type JoinOutcome = Result<Payload, Payload>;

/// Описание комнаты из списка `hubs` в ответе на вход в канал комнаты.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    #[serde(rename = "hub_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: String,
    /// WebRTC host
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub entry_mode: Option<String>,
    #[serde(default)]
    pub entry_code: Option<u64>,
}

/// `response` из ответа на вход в управляющий канал `ret`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    #[serde(deserialize_with = "opaque_string")]
    pub session_id: String,
    #[serde(default)]
    pub vapid_public_key: Option<String>,
}

/// `response` из ответа на вход в канал комнаты `hub:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoomResponse {
    #[serde(default, deserialize_with = "opaque_string_opt")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub perms_token: Option<String>,
    /// Записи `hubs` храним как есть: их форма не должна ломать вход в комнату.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hubs: Vec<Payload>,
}

impl RoomResponse {
    /// Первая запись `hubs`, если она есть. Ошибка означает, что запись не похожа на `RoomInfo`.
    pub fn room_info(&self) -> serde_json::Result<Option<RoomInfo>> {
        self.hubs
            .first()
            .map(|hub| RoomInfo::deserialize(hub))
            .transpose()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// session_id не имеет фиксированного формата: берём строковое представление любого скаляра.
fn opaque_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Err(serde::de::Error::custom("session_id is null")),
        other => Ok(other.to_string()),
    }
}

fn opaque_string_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
