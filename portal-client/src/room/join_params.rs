use portal_core::{NetworkId, Payload};
use serde_json::json;

/// Управляющий канал: устанавливает идентичность сессии до входа в комнату.
pub const CONTROL_TOPIC: &str = "ret";

pub fn room_topic(room_id: &str) -> String {
    format!("hub:{room_id}")
}

pub fn control_params(room_id: &str) -> Payload {
    json!({ "hub_id": room_id })
}

/// Параметры входа в канал комнаты: контекст не мобильный и не встроенный,
/// случайный `avatarId` и отображаемое имя, токен авторизации.
pub fn room_params(network_id: &NetworkId, display_name: &str, auth_token: &str) -> Payload {
    json!({
        "context": { "mobile": false, "embed": false },
        "profile": {
            "avatarId": network_id.as_str(),
            "displayName": display_name,
        },
        "auth_token": auth_token,
    })
}
