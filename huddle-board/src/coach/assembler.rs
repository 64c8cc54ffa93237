//! Streaming audio playback assembler
//!
//! Converts an arrival-ordered stream of base64 audio chunks into continuous
//! progressive playback through a [`MediaSink`]: playback begins as soon as
//! the first chunk is handed over, chunks are never reordered or dropped
//! (short of a sink transfer failure, which skips only the failing chunk),
//! and end-of-stream is signaled exactly once after the queue drains.
//!
//! The session owns all playback state explicitly. Teardown bumps a
//! generation token, so completion callbacks raised by an abandoned sink
//! can never mutate a successor session.

use std::collections::VecDeque;

use base64::{engine::general_purpose, Engine as _};
use huddle_common::{Error, Result};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::sink::{MediaSink, SinkEvent, SinkEventTx, SinkFactory};

/// Whether more input is expected from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Chunks may still arrive
    Collecting,
    /// The transport signaled completion
    Finished,
}

/// Terminal outcome of a playback session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Playback reached the natural end of the stream
    Completed,
    /// The sink or audio element failed
    Failed(String),
}

/// Live per-session playback state
///
/// Exists only between the first chunk arrival and teardown.
struct ActivePlayback {
    sink: Box<dyn MediaSink>,
    /// The sink has announced it accepts appends
    open: bool,
    /// An append transfer is in flight; the next one waits for completion
    transfer_in_flight: bool,
    /// Playback has been started (exactly once per session)
    started: bool,
    /// End-of-stream has been signaled to the sink
    ended_signaled: bool,
    stream: StreamState,
    /// Decoded chunks not yet handed to the sink, in arrival order
    pending: VecDeque<Vec<u8>>,
}

/// One audio playback session
///
/// Created per coach exchange; the sink itself is constructed lazily on
/// first chunk arrival because it only accepts input after it signals open.
pub struct PlaybackSession {
    factory: Box<dyn SinkFactory>,
    events: mpsc::UnboundedSender<(u64, SinkEvent)>,
    generation: u64,
    active: Option<ActivePlayback>,
}

impl PlaybackSession {
    /// Create a session; no media resources are acquired yet
    pub fn new(
        factory: Box<dyn SinkFactory>,
        events: mpsc::UnboundedSender<(u64, SinkEvent)>,
    ) -> Self {
        Self {
            factory,
            events,
            generation: 0,
            active: None,
        }
    }

    /// Decode one base64 chunk and queue it for transfer
    ///
    /// Synchronous and non-blocking: the actual hand-off to the sink happens
    /// from [`attempt_append`](Self::attempt_append), gated on sink
    /// readiness. The first chunk constructs the sink.
    pub fn submit_chunk(&mut self, base64_chunk: &str) -> Result<()> {
        let bytes = general_purpose::STANDARD
            .decode(base64_chunk)
            .map_err(|e| Error::Decode(e.to_string()))?;

        self.ensure_initialized()?;
        if let Some(active) = self.active.as_mut() {
            active.pending.push_back(bytes);
        }

        self.attempt_append();
        Ok(())
    }

    /// Construct the sink on first use
    fn ensure_initialized(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }

        let tx = SinkEventTx::new(self.events.clone(), self.generation);
        let sink = self.factory.open(tx)?;
        debug!("playback session initialized (generation {})", self.generation);

        self.active = Some(ActivePlayback {
            sink,
            open: false,
            transfer_in_flight: false,
            started: false,
            ended_signaled: false,
            stream: StreamState::Collecting,
            pending: VecDeque::new(),
        });
        Ok(())
    }

    /// Hand at most one queued chunk to the sink
    ///
    /// No-op unless the sink is open, idle, and the queue is non-empty; both
    /// re-entry triggers (new chunk, transfer completion) call this, so a
    /// redundant invocation is harmless. A failed append is logged and the
    /// drain moves on to the next chunk.
    pub fn attempt_append(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.open || active.transfer_in_flight {
            return;
        }

        while let Some(chunk) = active.pending.pop_front() {
            match active.sink.append(chunk) {
                Ok(()) => {
                    active.transfer_in_flight = true;
                    if !active.started {
                        active.started = true;
                        if let Err(e) = active.sink.start_playback() {
                            warn!("failed to start playback: {}", e);
                        }
                    }
                    return;
                }
                Err(e) => {
                    warn!("sink append failed, skipping chunk: {}", e);
                }
            }
        }
    }

    /// Record that the transport has no more chunks
    ///
    /// If the queue is already drained and the sink idle, end-of-stream is
    /// signaled immediately; otherwise it follows the final transfer
    /// completion.
    pub fn mark_stream_complete(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.stream = StreamState::Finished;
        }
        self.maybe_signal_end();
    }

    /// Apply a sink notification; returns the session outcome if terminal
    ///
    /// Events stamped with a stale generation belong to a torn-down session
    /// and are discarded.
    pub fn handle_sink_event(&mut self, generation: u64, event: SinkEvent) -> Option<SessionEnd> {
        if generation != self.generation {
            debug!(
                "ignoring sink event from stale generation {} (current {})",
                generation, self.generation
            );
            return None;
        }

        match event {
            SinkEvent::Opened => {
                if let Some(active) = self.active.as_mut() {
                    active.open = true;
                }
                self.attempt_append();
                self.maybe_signal_end();
                None
            }
            SinkEvent::TransferComplete => {
                if let Some(active) = self.active.as_mut() {
                    active.transfer_in_flight = false;
                }
                self.attempt_append();
                self.maybe_signal_end();
                None
            }
            SinkEvent::PlaybackEnded => {
                if self.active.is_none() {
                    return None;
                }
                self.teardown();
                Some(SessionEnd::Completed)
            }
            SinkEvent::Error(message) => {
                if self.active.is_none() {
                    return None;
                }
                self.teardown();
                Some(SessionEnd::Failed(message))
            }
        }
    }

    /// Signal end-of-stream once the stream is finished and fully drained
    fn maybe_signal_end(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.stream == StreamState::Finished
            && active.open
            && active.pending.is_empty()
            && !active.transfer_in_flight
            && !active.ended_signaled
        {
            active.ended_signaled = true;
            active.sink.end_of_stream();
        }
    }

    /// Release the sink and discard pending chunks
    ///
    /// Bumps the generation so late completion callbacks from the released
    /// sink are ignored. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            debug!(
                "tearing down playback session (generation {}, {} chunks discarded)",
                self.generation,
                active.pending.len()
            );
            active.sink.abort();
        }
        self.generation += 1;
    }

    /// Playback has started for the current session
    pub fn has_started(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.started)
    }

    /// A sink is currently held
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current generation token (stamped onto sink events)
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Calls observed by the mock sink, in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SinkCall {
        Append(Vec<u8>),
        StartPlayback,
        EndOfStream,
        Abort,
    }

    struct MockSink {
        calls: Arc<Mutex<Vec<SinkCall>>>,
        /// Append indices (0-based) that fail
        fail_appends: HashSet<usize>,
        appends_seen: usize,
    }

    impl MediaSink for MockSink {
        fn append(&mut self, chunk: Vec<u8>) -> huddle_common::Result<()> {
            let index = self.appends_seen;
            self.appends_seen += 1;
            if self.fail_appends.contains(&index) {
                return Err(Error::Sink(format!("scripted failure at append {index}")));
            }
            self.calls.lock().unwrap().push(SinkCall::Append(chunk));
            Ok(())
        }

        fn start_playback(&mut self) -> huddle_common::Result<()> {
            self.calls.lock().unwrap().push(SinkCall::StartPlayback);
            Ok(())
        }

        fn end_of_stream(&mut self) {
            self.calls.lock().unwrap().push(SinkCall::EndOfStream);
        }

        fn abort(&mut self) {
            self.calls.lock().unwrap().push(SinkCall::Abort);
        }
    }

    struct MockFactory {
        calls: Arc<Mutex<Vec<SinkCall>>>,
        fail_appends: HashSet<usize>,
        /// SinkEventTx handles given to opened sinks, latest last
        handles: Arc<Mutex<Vec<SinkEventTx>>>,
        opens: Arc<Mutex<usize>>,
    }

    impl SinkFactory for MockFactory {
        fn open(&mut self, events: SinkEventTx) -> huddle_common::Result<Box<dyn MediaSink>> {
            *self.opens.lock().unwrap() += 1;
            self.handles.lock().unwrap().push(events);
            Ok(Box::new(MockSink {
                calls: self.calls.clone(),
                fail_appends: self.fail_appends.clone(),
                appends_seen: 0,
            }))
        }
    }

    struct Harness {
        session: PlaybackSession,
        rx: mpsc::UnboundedReceiver<(u64, SinkEvent)>,
        calls: Arc<Mutex<Vec<SinkCall>>>,
        handles: Arc<Mutex<Vec<SinkEventTx>>>,
        opens: Arc<Mutex<usize>>,
    }

    impl Harness {
        fn new(fail_appends: HashSet<usize>) -> Self {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let handles = Arc::new(Mutex::new(Vec::new()));
            let opens = Arc::new(Mutex::new(0));
            let (tx, rx) = mpsc::unbounded_channel();
            let factory = MockFactory {
                calls: calls.clone(),
                fail_appends,
                handles: handles.clone(),
                opens: opens.clone(),
            };
            Self {
                session: PlaybackSession::new(Box::new(factory), tx),
                rx,
                calls,
                handles,
                opens,
            }
        }

        /// Deliver a sink event through the real channel path
        fn sink_sends(&self, event: SinkEvent) {
            let handles = self.handles.lock().unwrap();
            handles.last().expect("sink opened").send(event);
        }

        /// Drain queued sink events into the session
        fn pump(&mut self) -> Vec<SessionEnd> {
            let mut ends = Vec::new();
            while let Ok((generation, event)) = self.rx.try_recv() {
                if let Some(end) = self.session.handle_sink_event(generation, event) {
                    ends.push(end);
                }
            }
            ends
        }

        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_sink_constructed_lazily_and_once() {
        let mut h = Harness::new(HashSet::new());
        assert!(!h.session.is_active());
        assert_eq!(*h.opens.lock().unwrap(), 0);

        h.session.submit_chunk(&b64(b"one")).unwrap();
        h.session.submit_chunk(&b64(b"two")).unwrap();

        assert!(h.session.is_active());
        assert_eq!(*h.opens.lock().unwrap(), 1);
    }

    #[test]
    fn test_chunks_reach_sink_in_submission_order() {
        let mut h = Harness::new(HashSet::new());

        // Burst arrives before the sink is even open
        h.session.submit_chunk(&b64(b"aaa")).unwrap();
        h.session.submit_chunk(&b64(b"bbb")).unwrap();
        h.session.submit_chunk(&b64(b"ccc")).unwrap();
        assert!(h.calls().is_empty());

        h.sink_sends(SinkEvent::Opened);
        h.pump();
        // Exactly one chunk per completion, FIFO
        assert_eq!(
            h.calls(),
            vec![
                SinkCall::Append(b"aaa".to_vec()),
                SinkCall::StartPlayback
            ]
        );

        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();

        let appended: Vec<SinkCall> = h
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .collect();
        assert_eq!(
            appended,
            vec![
                SinkCall::Append(b"aaa".to_vec()),
                SinkCall::Append(b"bbb".to_vec()),
                SinkCall::Append(b"ccc".to_vec()),
            ]
        );
    }

    #[test]
    fn test_chunks_submitted_while_busy_are_queued_not_dropped() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"first")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();

        // Sink is now mid-transfer; a burst arrives
        h.session.submit_chunk(&b64(b"second")).unwrap();
        h.session.submit_chunk(&b64(b"third")).unwrap();

        let appends_before = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .count();
        assert_eq!(appends_before, 1);

        // Draining continues only through completion notifications
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();

        let appended: Vec<SinkCall> = h
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .collect();
        assert_eq!(
            appended,
            vec![
                SinkCall::Append(b"first".to_vec()),
                SinkCall::Append(b"second".to_vec()),
                SinkCall::Append(b"third".to_vec()),
            ]
        );
    }

    #[test]
    fn test_playback_starts_once_on_first_successful_transfer() {
        // First append fails; playback must not start until a transfer lands
        let mut h = Harness::new(HashSet::from([0]));

        h.session.submit_chunk(&b64(b"bad")).unwrap();
        h.session.submit_chunk(&b64(b"good")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();

        let starts = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::StartPlayback))
            .count();
        assert_eq!(starts, 1);
        // The failing chunk was skipped, the next one transferred
        assert!(h.calls().contains(&SinkCall::Append(b"good".to_vec())));
        assert!(!h.calls().contains(&SinkCall::Append(b"bad".to_vec())));

        // Later completions never start playback again
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        let starts = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::StartPlayback))
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_end_of_stream_waits_for_drain_and_fires_once() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"a")).unwrap();
        h.session.submit_chunk(&b64(b"b")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();

        // Stream completes while a transfer is in flight and one chunk queued
        h.session.mark_stream_complete();
        assert!(!h.calls().contains(&SinkCall::EndOfStream));

        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        assert!(!h.calls().contains(&SinkCall::EndOfStream));

        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        let ends = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::EndOfStream))
            .count();
        assert_eq!(ends, 1);

        // Idempotent: a stray completion or repeated mark never re-signals
        h.session.mark_stream_complete();
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();
        let ends = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::EndOfStream))
            .count();
        assert_eq!(ends, 1);
    }

    #[test]
    fn test_complete_with_empty_queue_signals_immediately() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"only")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();
        h.sink_sends(SinkEvent::TransferComplete);
        h.pump();

        h.session.mark_stream_complete();
        assert!(h.calls().contains(&SinkCall::EndOfStream));
    }

    #[test]
    fn test_playback_ended_tears_down_and_reports() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"x")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();
        h.session.mark_stream_complete();
        h.sink_sends(SinkEvent::TransferComplete);
        h.sink_sends(SinkEvent::PlaybackEnded);

        let ends = h.pump();
        assert_eq!(ends, vec![SessionEnd::Completed]);
        assert!(!h.session.is_active());
        assert!(h.calls().contains(&SinkCall::Abort));
    }

    #[test]
    fn test_sink_error_fails_session() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"x")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();
        h.sink_sends(SinkEvent::Error("decode failure".to_string()));

        let ends = h.pump();
        assert_eq!(ends, vec![SessionEnd::Failed("decode failure".to_string())]);
        assert!(!h.session.is_active());
    }

    #[test]
    fn test_stale_events_cannot_touch_successor_session() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"old")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();
        let old_generation = h.session.generation();

        // Supersede the session, then start a new one
        h.session.teardown();
        h.session.submit_chunk(&b64(b"new")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();
        assert_eq!(*h.opens.lock().unwrap(), 2);

        let appends_before = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .count();

        // A late completion from the old sink must be ignored entirely
        let outcome = h
            .session
            .handle_sink_event(old_generation, SinkEvent::TransferComplete);
        assert_eq!(outcome, None);
        let appends_after = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .count();
        assert_eq!(appends_before, appends_after);

        // So must a late error: the new session stays active
        let outcome = h
            .session
            .handle_sink_event(old_generation, SinkEvent::Error("late".to_string()));
        assert_eq!(outcome, None);
        assert!(h.session.is_active());
    }

    #[test]
    fn test_malformed_base64_is_rejected_without_initializing() {
        let mut h = Harness::new(HashSet::new());

        let result = h.session.submit_chunk("not base64 !!!");
        assert!(matches!(result, Err(Error::Decode(_))));
        assert!(!h.session.is_active());
        assert_eq!(*h.opens.lock().unwrap(), 0);
    }

    #[test]
    fn test_teardown_discards_pending_chunks() {
        let mut h = Harness::new(HashSet::new());

        h.session.submit_chunk(&b64(b"a")).unwrap();
        h.session.submit_chunk(&b64(b"b")).unwrap();
        h.sink_sends(SinkEvent::Opened);
        h.pump();

        h.session.teardown();
        assert!(!h.session.is_active());

        // Nothing further drains after teardown
        h.session.attempt_append();
        let appends = h
            .calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Append(_)))
            .count();
        assert_eq!(appends, 1);
    }
}
