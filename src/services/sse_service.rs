use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    services::sse_events,
    state::SharedState,
};

/// Open the public stream: a handshake, then every row image, content change
/// and degraded-mode toggle, in the order they are published.
pub fn public_stream(
    state: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let mut images = state.feed().subscribe_state();
    let mut changes = state.feed().subscribe_content();
    let mut degraded = state.degraded_watcher();
    let handshake = sse_events::handshake(*degraded.borrow_and_update());

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(event) = handshake {
            if tx.send(Ok(to_event(event))).await.is_err() {
                return;
            }
        }

        loop {
            let next = tokio::select! {
                _ = tx.closed() => break,
                Some(image) = images.next() => sse_events::state_changed(&image),
                Some(change) = changes.next() => sse_events::content_changed(&change),
                changed = degraded.changed() => match changed {
                    Ok(()) => sse_events::system_status(*degraded.borrow_and_update()),
                    Err(_) => break,
                },
                else => break,
            };

            if let Some(event) = next {
                if tx.send(Ok(to_event(event))).await.is_err() {
                    break;
                }
            }
        }

        tracing::info!("public SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    Event::default().event(payload.name).data(payload.data)
}
