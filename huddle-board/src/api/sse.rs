//! SSE streams
//!
//! Two stream shapes: the change-notification stream backed by the shared
//! broadcast channel, and the per-exchange coach relay stream backed by an
//! mpsc channel owned by the exchange task.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{BroadcastStream, UnboundedReceiverStream};
use tracing::{info, warn};

use crate::coach::RelayFrame;
use crate::state::SharedState;

/// SSE stream of change notifications for a connecting client
pub fn event_stream(
    shared: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to change notifications");

    let rx = shared.subscribe_events();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Event::default()
                .event(event.event_name())
                .json_data(&event)
                .ok()
                .map(Ok),
            Err(e) => {
                // Lagged receivers skip missed events and continue
                warn!("SSE client error: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}

/// SSE stream relaying one coach exchange to its caller
///
/// The stream ends when the exchange task drops its sender.
pub fn coach_relay_stream(
    rx: mpsc::UnboundedReceiver<RelayFrame>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx)
        .filter_map(|frame| async move { Event::default().json_data(&frame).ok().map(Ok) });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
