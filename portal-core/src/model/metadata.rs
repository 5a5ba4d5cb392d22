use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Ответ `GET <server>/api/v1/meta`: где на самом деле живёт сокет.
///
/// `{"version":"1.0.20191126041226","pool":"earth","phx_port":"4000","phx_host":"heuristic-werewolf.reticulum.io"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketMetadata {
    pub version: String,
    pub pool: String,
    #[serde(rename = "phx_host")]
    pub socket_host: String,
    #[serde(rename = "phx_port", default, deserialize_with = "port_as_string")]
    pub socket_port: Option<String>,
}

// phx_port приходит строкой, но некоторые инсталляции отдают число.
fn port_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl fmt::Display for SocketMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version: {}; pool: {}; phx_host: {}; phx_port: {}",
            self.version,
            self.pool,
            self.socket_host,
            self.socket_port.as_deref().unwrap_or("-")
        )
    }
}
