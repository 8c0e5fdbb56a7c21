//! Adapts the orchestrator's event channel into an SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use bevgenie_core::StreamEvent;
use std::convert::Infallible;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub(crate) type EventStream =
    Pin<Box<dyn futures_util::Stream<Item = Result<Event, Infallible>> + Send + 'static>>;

fn to_sse(event: &StreamEvent) -> serde_json::Result<Event> {
    Ok(Event::default()
        .event(event.name())
        .data(event.data()?.to_string()))
}

/// Ends when the pipeline drops its sender.
pub(crate) fn event_stream(mut rx: UnboundedReceiver<StreamEvent>) -> Sse<EventStream> {
    use async_stream::stream;
    let s = stream! {
        while let Some(event) = rx.recv().await {
            match to_sse(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => {
                    tracing::error!(target: "bevgenie::gateway", event = event.name(), error = %e, "failed to encode event");
                    if event.is_terminal() {
                        yield Ok(Event::default().event("error").data(r#"{"error":"Failed to encode response"}"#));
                    }
                }
            }
        }
    };
    let boxed: EventStream = Box::pin(s);
    Sse::new(boxed).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
