use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::mpsc::{self, error::SendError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{BuzzerSlot, TeamTag},
    dto::ws::{BuzzerInboundMessage, BuzzerOutboundMessage, ClaimResponse},
    error::ServiceError,
    state::{
        BuzzerConnection, SharedState,
        buzzer::{self, ClaimOutcome, StoreCell},
    },
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve a claim for `team` and publish the new image when it wins.
pub async fn claim_for(state: &SharedState, team: TeamTag) -> Result<ClaimResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let outcome = buzzer::claim(&StoreCell(store), team).await?;
    let won = outcome.is_won();
    match outcome {
        ClaimOutcome::Won(image) => {
            info!(team = team.as_str(), "buzzer latched");
            state.feed().publish_state(image);
        }
        ClaimOutcome::NotArmed => debug!(team = team.as_str(), "buzz while locked"),
        ClaimOutcome::LostRace => debug!(team = team.as_str(), "buzz lost the race"),
    }
    Ok(ClaimResponse { team, won })
}

/// Serve one buzzer device until it disconnects.
///
/// The first frame must be an identification naming the team; the socket is
/// closed otherwise, or when nothing arrives within the identification timeout.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("buzzer identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let team = match serde_json::from_str::<BuzzerInboundMessage>(&initial_message)
        .ok()
        .and_then(|message| message.identification_team())
    {
        Some(team) => team,
        None => {
            warn!(payload = %initial_message, "first buzzer message was not an identification");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection_id = Uuid::new_v4();
    state.buzzers().insert(
        connection_id,
        BuzzerConnection {
            team,
            tx: outbound_tx.clone(),
        },
    );
    info!(%connection_id, team = team.as_str(), "buzzer connected");

    let _ = send(&outbound_tx, &BuzzerOutboundMessage::Identified { team });
    if let Ok(store) = state.require_game_store().await {
        match store.load_state().await {
            Ok(row) => {
                let _ = send(&outbound_tx, &BuzzerOutboundMessage::from(row.buzzer()));
            }
            Err(err) => warn!(error = %err, "failed to load buzzer status"),
        }
    }

    let status_task = spawn_status_forwarder(&state, outbound_tx.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<BuzzerInboundMessage>(&text) {
                Ok(BuzzerInboundMessage::Buzz { team: claimed }) => {
                    if claimed.is_some_and(|claimed| claimed != team) {
                        warn!(%connection_id, "buzz for a team the socket is not bound to");
                        continue;
                    }
                    let won = match claim_for(&state, team).await {
                        Ok(response) => response.won,
                        Err(err) => {
                            warn!(%connection_id, error = %err, "buzz could not be resolved");
                            false
                        }
                    };
                    if send(&outbound_tx, &BuzzerOutboundMessage::BuzzResult { team, won }).is_err() {
                        break;
                    }
                }
                Ok(BuzzerInboundMessage::Identification { .. }) => {
                    warn!(%connection_id, "ignoring duplicate identification message");
                }
                Ok(BuzzerInboundMessage::Unknown) => {
                    debug!(%connection_id, payload = %text, "ignoring unknown buzzer message");
                }
                Err(err) => {
                    warn!(%connection_id, error = %err, "failed to parse buzzer message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, "buzzer closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    status_task.abort();
    state.buzzers().remove(&connection_id);
    info!(%connection_id, "buzzer disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Push a status frame every time the buzzer pair changes.
fn spawn_status_forwarder(
    state: &SharedState,
    tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    let mut images = state.feed().subscribe_state();
    tokio::spawn(async move {
        let mut last: Option<BuzzerSlot> = None;
        while let Some(image) = images.next().await {
            let slot = image.buzzer();
            if last == Some(slot) {
                continue;
            }
            last = Some(slot);
            if send(&tx, &BuzzerOutboundMessage::from(slot)).is_err() {
                break;
            }
        }
    })
}

/// Serialize `value` onto the writer channel. Fails only once the writer is gone.
fn send(
    tx: &mpsc::UnboundedSender<Message>,
    value: &BuzzerOutboundMessage,
) -> Result<(), SendError<Message>> {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize buzzer message `{value:?}`");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into()))
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::memory::MemoryGameStore, models::BuzzerState},
        state::AppState,
    };

    #[tokio::test]
    async fn first_claim_wins_and_is_published() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::default())).await;
        let mut images = state.feed().subscribe_state();

        let first = claim_for(&state, TeamTag::B).await.unwrap();
        let second = claim_for(&state, TeamTag::A).await.unwrap();

        assert!(first.won);
        assert!(!second.won);
        let image = images.next().await.unwrap();
        assert_eq!(image.buzzer_state, BuzzerState::Locked);
        assert_eq!(image.buzzer_winner, Some(TeamTag::B));
    }

    #[tokio::test]
    async fn claims_fail_while_degraded() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            claim_for(&state, TeamTag::A).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn status_forwarder_skips_unchanged_slots() {
        let state =
            AppState::with_store(AppConfig::default(), Arc::new(MemoryGameStore::default())).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = spawn_status_forwarder(&state, tx);

        let mut image = crate::dao::models::GameStateEntity::default();
        image.team_a_score = 10;
        image.version = 1;
        state.feed().publish_state(image.clone());
        image.team_a_score = 20;
        image.version = 2;
        state.feed().publish_state(image.clone());
        image.set_buzzer(BuzzerSlot::locked(Some(TeamTag::A)));
        image.version = 3;
        state.feed().publish_state(image);

        let Message::Text(first) = rx.recv().await.unwrap() else {
            panic!("expected text frame");
        };
        assert!(first.as_str().contains("\"armed\""));
        let Message::Text(second) = rx.recv().await.unwrap() else {
            panic!("expected text frame");
        };
        assert!(second.as_str().contains("\"locked\""));
        assert!(rx.try_recv().is_err());
        task.abort();
    }
}
