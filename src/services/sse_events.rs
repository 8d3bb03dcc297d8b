use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::GameStateEntity,
    dto::{
        sse::{Handshake, ServerEvent, SystemStatus},
        state::GameStateSnapshot,
    },
    state::feed::ContentChange,
};

pub const EVENT_HANDSHAKE: &str = "handshake";
pub const EVENT_STATE: &str = "state";
pub const EVENT_CONTENT: &str = "content";
pub const EVENT_SYSTEM: &str = "system";

/// First frame of every public stream.
pub fn handshake(degraded: bool) -> Option<ServerEvent> {
    encode(
        EVENT_HANDSHAKE,
        &Handshake {
            message: "subscribed to game state".into(),
            degraded,
        },
    )
}

/// Post-mutation row image.
pub fn state_changed(image: &GameStateEntity) -> Option<ServerEvent> {
    encode(EVENT_STATE, &GameStateSnapshot::from(image))
}

/// Content table notification; clients refetch the hierarchy.
pub fn content_changed(change: &ContentChange) -> Option<ServerEvent> {
    encode(EVENT_CONTENT, change)
}

/// Degraded mode toggled.
pub fn system_status(degraded: bool) -> Option<ServerEvent> {
    encode(EVENT_SYSTEM, &SystemStatus { degraded })
}

fn encode<T: Serialize>(event: &'static str, payload: &T) -> Option<ServerEvent> {
    match ServerEvent::encode(event, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::feed::{ChangeKind, ContentTable};

    #[test]
    fn events_carry_their_name_and_json_body() {
        let event = content_changed(&ContentChange {
            table: ContentTable::Answer,
            kind: ChangeKind::Delete,
            id: Uuid::nil(),
        })
        .unwrap();
        assert_eq!(event.name, EVENT_CONTENT);
        let body: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(body["table"], "answer");
        assert_eq!(body["kind"], "delete");

        let status = system_status(true).unwrap();
        assert_eq!(status.data, r#"{"degraded":true}"#);
    }
}
