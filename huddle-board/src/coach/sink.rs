//! Progressive media sink collaborator
//!
//! Models the browser-supplied append-only media buffer: byte ranges are
//! appended in arrival order, at most one transfer is in flight at a time,
//! and completion, playback lifecycle, and failures arrive asynchronously as
//! [`SinkEvent`]s. The assembler never assumes an append landed until the
//! sink says so.

use huddle_common::Result;
use tokio::sync::mpsc;
use tracing::debug;

/// Notifications emitted by a media sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// The sink finished opening and now accepts appends
    Opened,
    /// The in-flight append transfer finished
    TransferComplete,
    /// Playback reached the natural end of the stream
    PlaybackEnded,
    /// The sink or its audio element failed
    Error(String),
}

/// Sender half for sink events, stamped with the owning session generation
///
/// A torn-down session bumps its generation; events carrying a stale stamp
/// are discarded instead of mutating a successor session's state.
#[derive(Debug, Clone)]
pub struct SinkEventTx {
    tx: mpsc::UnboundedSender<(u64, SinkEvent)>,
    generation: u64,
}

impl SinkEventTx {
    pub fn new(tx: mpsc::UnboundedSender<(u64, SinkEvent)>, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Emit a sink event; dropped receivers are ignored
    pub fn send(&self, event: SinkEvent) {
        if self.tx.send((self.generation, event)).is_err() {
            debug!("sink event dropped: session receiver gone");
        }
    }
}

/// Append-only progressive media sink
///
/// Contract:
/// - `append` starts at most one transfer; the caller must wait for
///   `SinkEvent::TransferComplete` before the next `append`.
/// - `end_of_stream` is idempotent; signaling twice must not fail.
/// - `abort` releases media resources; no events may be acted on afterwards
///   (the generation stamp enforces this on the session side).
pub trait MediaSink: Send {
    /// Begin an append transfer for one chunk
    fn append(&mut self, chunk: Vec<u8>) -> Result<()>;

    /// Start playback of the bound audio element
    fn start_playback(&mut self) -> Result<()>;

    /// Declare that no more data is coming
    fn end_of_stream(&mut self);

    /// Detach the source and release media resources
    fn abort(&mut self);
}

/// Constructs a media sink for a new playback session
///
/// The sink is created lazily, on first chunk arrival, and must announce
/// readiness with `SinkEvent::Opened` before any append is attempted.
pub trait SinkFactory: Send {
    fn open(&mut self, events: SinkEventTx) -> Result<Box<dyn MediaSink>>;
}

/// Frames forwarded by [`StreamingSink`] to the API relay stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkFrame {
    /// One ordered chunk of audio bytes
    Chunk(Vec<u8>),
    /// No more audio is coming
    End,
}

/// Media sink that relays ordered bytes to an outgoing stream
///
/// Stands in for the browser's media element on the service side: appended
/// chunks are forwarded, in order, to a channel drained by the caller's SSE
/// response. Delivery to the channel counts as transfer completion, and the
/// end-of-stream signal counts as playback reaching its natural end.
pub struct StreamingSink {
    out: mpsc::UnboundedSender<SinkFrame>,
    events: SinkEventTx,
    ended: bool,
}

impl StreamingSink {
    pub fn new(out: mpsc::UnboundedSender<SinkFrame>, events: SinkEventTx) -> Self {
        // A channel-backed sink has no async open handshake; it is usable
        // immediately and says so up front.
        events.send(SinkEvent::Opened);
        Self {
            out,
            events,
            ended: false,
        }
    }
}

impl MediaSink for StreamingSink {
    fn append(&mut self, chunk: Vec<u8>) -> Result<()> {
        self.out
            .send(SinkFrame::Chunk(chunk))
            .map_err(|_| huddle_common::Error::Sink("relay stream closed".to_string()))?;
        self.events.send(SinkEvent::TransferComplete);
        Ok(())
    }

    fn start_playback(&mut self) -> Result<()> {
        // Playback happens at the receiving client; nothing to trigger here.
        Ok(())
    }

    fn end_of_stream(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        let _ = self.out.send(SinkFrame::End);
        self.events.send(SinkEvent::PlaybackEnded);
    }

    fn abort(&mut self) {
        self.ended = true;
    }
}

/// Factory producing [`StreamingSink`]s bound to one relay channel
pub struct StreamingSinkFactory {
    out: mpsc::UnboundedSender<SinkFrame>,
}

impl StreamingSinkFactory {
    pub fn new(out: mpsc::UnboundedSender<SinkFrame>) -> Self {
        Self { out }
    }
}

impl SinkFactory for StreamingSinkFactory {
    fn open(&mut self, events: SinkEventTx) -> Result<Box<dyn MediaSink>> {
        Ok(Box::new(StreamingSink::new(self.out.clone(), events)))
    }
}
