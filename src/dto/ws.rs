use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::{BuzzerSlot, BuzzerState, TeamTag};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from buzzer WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuzzerInboundMessage {
    /// First message binding the socket to a team.
    Identification { team: TeamTag },
    /// Claim attempt; the team defaults to the identified one.
    Buzz {
        #[serde(default)]
        team: Option<TeamTag>,
    },
    #[serde(other)]
    Unknown,
}

impl BuzzerInboundMessage {
    pub fn identification_team(&self) -> Option<TeamTag> {
        match self {
            Self::Identification { team } => Some(*team),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to buzzer WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuzzerOutboundMessage {
    /// Acknowledges a successful identification.
    Identified { team: TeamTag },
    /// Answer to a buzz.
    BuzzResult { team: TeamTag, won: bool },
    /// Current buzzer pair, sent on connect and on every change.
    BuzzerStatus {
        state: BuzzerState,
        winner: Option<TeamTag>,
    },
}

impl From<BuzzerSlot> for BuzzerOutboundMessage {
    fn from(slot: BuzzerSlot) -> Self {
        Self::BuzzerStatus {
            state: slot.state(),
            winner: slot.winner(),
        }
    }
}

/// Body of the REST claim fallback.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    pub team: TeamTag,
    pub won: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_messages_use_a_type_tag() {
        let ident: BuzzerInboundMessage =
            serde_json::from_str(r#"{"type":"identification","team":"b"}"#).unwrap();
        assert_eq!(ident.identification_team(), Some(TeamTag::B));

        let buzz: BuzzerInboundMessage = serde_json::from_str(r#"{"type":"buzz"}"#).unwrap();
        assert!(matches!(buzz, BuzzerInboundMessage::Buzz { team: None }));

        let other: BuzzerInboundMessage =
            serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(other, BuzzerInboundMessage::Unknown));
    }

    #[test]
    fn status_message_shape() {
        let message = BuzzerOutboundMessage::from(BuzzerSlot::locked(Some(TeamTag::A)));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "buzzer_status", "state": "locked", "winner": "a"})
        );
    }
}
