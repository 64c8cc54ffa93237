//! Voice coach exchange
//!
//! An exchange sends the user's message to the external coaching backend,
//! consumes its server-sent event stream, and assembles the returned audio
//! chunks into progressive playback while relaying transcript text to the
//! caller.

pub mod assembler;
pub mod client;
pub mod exchange;
pub mod sink;

pub use assembler::{PlaybackSession, SessionEnd, StreamState};
pub use client::{CoachClient, CoachError, CoachMessage};
pub use exchange::{run_exchange, CoachChatRequest, RelayFrame};
pub use sink::{
    MediaSink, SinkEvent, SinkEventTx, SinkFactory, SinkFrame, StreamingSink, StreamingSinkFactory,
};
