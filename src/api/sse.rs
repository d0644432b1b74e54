//! Server-Sent Events support

use crate::runtime::SseEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(e) => {
            // A slow client misses intermediate ticks; the next update carries full content
            tracing::debug!(error = %e, "SSE subscriber lagged");
            None
        }
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

/// SSE event name and JSON body
fn event_payload(event: SseEvent) -> (&'static str, Value) {
    match event {
        SseEvent::Init { session, state } => (
            "init",
            json!({
                "type": "init",
                "session": session,
                "state": state
            }),
        ),
        SseEvent::TurnAppended { session_id, turn } => (
            "turn_appended",
            json!({
                "type": "turn_appended",
                "session_id": session_id,
                "turn": turn
            }),
        ),
        SseEvent::TurnUpdated {
            session_id,
            turn_id,
            content,
        } => (
            "turn_updated",
            json!({
                "type": "turn_updated",
                "session_id": session_id,
                "turn_id": turn_id,
                "content": content
            }),
        ),
        SseEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        SseEvent::ReplyDone {
            session_id,
            turn_id,
        } => (
            "reply_done",
            json!({
                "type": "reply_done",
                "session_id": session_id,
                "turn_id": turn_id
            }),
        ),
        SseEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
