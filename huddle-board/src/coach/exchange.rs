//! Coach exchange orchestration
//!
//! Runs one voice exchange end to end: opens the coaching stream, feeds
//! transcript text and assembler-ordered audio to the relay channel drained
//! by the caller's SSE response, and broadcasts status transitions. The
//! playback session is owned here and torn down on every exit path.

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use huddle_common::events::{CoachStatus, HuddleEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::assembler::{PlaybackSession, SessionEnd};
use super::client::{CoachClient, CoachError, CoachMessage};
use super::sink::{SinkFrame, StreamingSinkFactory};
use crate::state::SharedState;

/// Incoming coach chat request
#[derive(Debug, Deserialize)]
pub struct CoachChatRequest {
    pub message: String,
    pub board_id: Uuid,
}

/// Frames relayed to the caller over the coach SSE response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayFrame {
    Status { status: CoachStatus },
    Text { content: String },
    Audio { chunk: String },
    Error { error: String },
    Done,
}

struct Relay {
    tx: mpsc::UnboundedSender<RelayFrame>,
    state: Arc<SharedState>,
}

impl Relay {
    /// Forward a frame; returns false once the caller has disconnected
    fn send(&self, frame: RelayFrame) -> bool {
        self.tx.send(frame).is_ok()
    }

    fn set_status(&self, status: CoachStatus) {
        self.state.broadcast_event(HuddleEvent::CoachStatusChanged {
            status,
            timestamp: chrono::Utc::now(),
        });
        let _ = self.tx.send(RelayFrame::Status { status });
    }
}

/// Run one coach exchange to completion
///
/// Every exit path leaves the coach status at Idle and the playback session
/// torn down (explicitly, or through the session's drop guard if the task
/// itself is aborted by a superseding exchange).
pub async fn run_exchange(
    client: Arc<CoachClient>,
    request: CoachChatRequest,
    state: Arc<SharedState>,
    relay_tx: mpsc::UnboundedSender<RelayFrame>,
) {
    let relay = Relay {
        tx: relay_tx,
        state,
    };
    relay.set_status(CoachStatus::Processing);
    info!("coach exchange started for board {}", request.board_id);

    let mut stream = match client.chat(&request.message, request.board_id).await {
        Ok(stream) => stream,
        Err(e) => {
            let error = match e {
                CoachError::Status(code) => format!("Error {code}"),
                CoachError::Network(message) => message,
            };
            warn!("coach exchange failed to start: {}", error);
            relay.send(RelayFrame::Error { error });
            relay.set_status(CoachStatus::Idle);
            return;
        }
    };

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
    let mut session =
        PlaybackSession::new(Box::new(StreamingSinkFactory::new(frame_tx)), sink_tx);

    let mut transport_done = false;
    let mut playing = false;

    loop {
        tokio::select! {
            message = stream.next_message(), if !transport_done => {
                match message {
                    Ok(Some(CoachMessage::Text { content })) => {
                        if !relay.send(RelayFrame::Text { content }) {
                            session.teardown();
                            relay.set_status(CoachStatus::Idle);
                            return;
                        }
                    }
                    Ok(Some(CoachMessage::Audio { chunk })) => {
                        if let Err(e) = session.submit_chunk(&chunk) {
                            warn!("dropping undecodable audio chunk: {}", e);
                        }
                    }
                    Ok(Some(CoachMessage::Error { error })) => {
                        // Backend abort: no partial audio continues playing
                        session.teardown();
                        relay.send(RelayFrame::Error { error });
                        relay.set_status(CoachStatus::Idle);
                        return;
                    }
                    Ok(Some(CoachMessage::Done)) | Ok(None) => {
                        session.mark_stream_complete();
                        if !session.is_active() {
                            // Stream carried no audio at all
                            relay.send(RelayFrame::Done);
                            relay.set_status(CoachStatus::Idle);
                            return;
                        }
                        transport_done = true;
                    }
                    Err(e) => {
                        session.teardown();
                        relay.send(RelayFrame::Error { error: e.to_string() });
                        relay.set_status(CoachStatus::Idle);
                        return;
                    }
                }
            }
            Some(frame) = frame_rx.recv() => {
                relay_sink_frame(&relay, frame);
            }
            Some((generation, event)) = sink_rx.recv() => {
                match session.handle_sink_event(generation, event) {
                    Some(SessionEnd::Completed) => {
                        // Flush audio frames that raced the terminal event
                        while let Ok(frame) = frame_rx.try_recv() {
                            relay_sink_frame(&relay, frame);
                        }
                        relay.send(RelayFrame::Done);
                        relay.set_status(CoachStatus::Idle);
                        info!("coach exchange completed");
                        return;
                    }
                    Some(SessionEnd::Failed(error)) => {
                        while let Ok(frame) = frame_rx.try_recv() {
                            relay_sink_frame(&relay, frame);
                        }
                        relay.send(RelayFrame::Error { error });
                        relay.set_status(CoachStatus::Idle);
                        return;
                    }
                    None => {}
                }
            }
        }

        if !playing && session.has_started() {
            playing = true;
            relay.set_status(CoachStatus::Playing);
        }
    }
}

fn relay_sink_frame(relay: &Relay, frame: SinkFrame) {
    match frame {
        SinkFrame::Chunk(bytes) => {
            relay.send(RelayFrame::Audio {
                chunk: general_purpose::STANDARD.encode(bytes),
            });
        }
        SinkFrame::End => {}
    }
}
