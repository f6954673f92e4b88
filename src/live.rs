// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Live sessions.
//!
//! A session is one dedicated generation thread that renders fixed-size chunks and
//! pushes them to an [`OutputSink`] until it is stopped. The control path talks to it
//! through exactly two things: a [`CancelHandle`] and a [`PendingSlot`] holding the
//! latest parameter update. Everything else the thread touches, it owns.

pub mod generator;
pub mod slot;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thread_priority::ThreadPriorityValue;
use tracing::{debug, error, info, span, Level};

use crate::audio::thread_priority::{
    configure_generation_thread_priority, generation_thread_priority, rt_audio_enabled,
};
use crate::audio::{AudioFormat, OutputSink, SinkError};
use crate::params::ParameterSnapshot;
use crate::playsync::CancelHandle;
use crate::synth::DEFAULT_MAX_VOICES;

pub use generator::{GeneratedChunk, Generator};
pub use slot::PendingSlot;

/// Default frames per chunk (about 23 ms).
pub const DEFAULT_CHUNK_FRAMES: usize = 1024;

/// Default time the sink may block before the session gives up.
pub const DEFAULT_SINK_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors reported by the live controller.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    #[error("Unable to start generation thread: {0}")]
    StartFailed(#[source] std::io::Error),

    #[error("Generation thread exited before it was ready")]
    NotReady,

    #[error("Live session aborted: {0}")]
    Sink(#[from] SinkError),
}

/// The session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Running => write!(f, "running"),
        }
    }
}

/// How live sessions generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    /// Frames per chunk.
    pub chunk_frames: usize,
    /// Global voice limit.
    pub max_voices: usize,
    /// How long a push may block before the session aborts.
    pub sink_timeout: Duration,
    /// Pace generation to real time instead of relying on sink backpressure alone.
    pub realtime: bool,
    /// Raise the generation thread's scheduling priority.
    pub thread_priority: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        LiveSettings {
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            max_voices: DEFAULT_MAX_VOICES,
            sink_timeout: DEFAULT_SINK_TIMEOUT,
            realtime: false,
            thread_priority: false,
        }
    }
}

/// A running session as seen from the control path.
struct Session {
    cancel: CancelHandle,
    join: JoinHandle<()>,
    /// Set by the generation thread when it exits on its own.
    finished: Arc<AtomicBool>,
}

impl Session {
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Stops the generation thread and waits for it to exit.
    fn shutdown(self) {
        self.cancel.cancel();
        if self.join.join().is_err() {
            error!("Generation thread panicked");
        }
    }
}

/// Everything the generation thread needs, moved into it at spawn.
struct SessionContext {
    snapshot: ParameterSnapshot,
    settings: LiveSettings,
    sink: Arc<dyn OutputSink>,
    pending: Arc<PendingSlot>,
    cancel: CancelHandle,
    finished: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<LiveError>>>,
    priority: Option<ThreadPriorityValue>,
    rt_audio: bool,
}

/// Starts, updates and stops live sessions. At most one session runs at a time.
pub struct LiveController {
    sink: Arc<dyn OutputSink>,
    settings: LiveSettings,
    session: Mutex<Option<Session>>,
    pending: Arc<PendingSlot>,
    /// The snapshot the next session starts with.
    last_known: Mutex<ParameterSnapshot>,
    last_error: Arc<Mutex<Option<LiveError>>>,
    sessions_started: AtomicU64,
}

impl LiveController {
    pub fn new(
        sink: Arc<dyn OutputSink>,
        settings: LiveSettings,
        initial: ParameterSnapshot,
    ) -> LiveController {
        LiveController {
            sink,
            settings,
            session: Mutex::new(None),
            pending: Arc::new(PendingSlot::new()),
            last_known: Mutex::new(initial),
            last_error: Arc::new(Mutex::new(None)),
            sessions_started: AtomicU64::new(0),
        }
    }

    /// Starts a session with the last known snapshot. Returns once the generation thread
    /// is running. If a session is already running this does nothing and succeeds.
    pub fn start(&self) -> Result<(), LiveError> {
        let mut session = self.session.lock();
        if let Some(existing) = session.take() {
            if !existing.is_finished() {
                debug!("Live session already running");
                *session = Some(existing);
                return Ok(());
            }
            // The previous session aborted on its own; reap it.
            existing.shutdown();
        }

        // Updates offered to a previous session must not leak into this one.
        self.pending.take();

        let cancel = CancelHandle::new();
        let finished = Arc::new(AtomicBool::new(false));
        let snapshot = *self.last_known.lock();
        let context = SessionContext {
            snapshot,
            settings: self.settings,
            sink: self.sink.clone(),
            pending: self.pending.clone(),
            cancel: cancel.clone(),
            finished: finished.clone(),
            last_error: self.last_error.clone(),
            priority: if self.settings.thread_priority {
                generation_thread_priority()
            } else {
                None
            },
            rt_audio: rt_audio_enabled(),
        };

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let join = thread::Builder::new()
            .name("scoregen-live".to_string())
            .spawn(move || {
                if ready_tx.send(()).is_ok() {
                    run_session(context);
                }
            })
            .map_err(LiveError::StartFailed)?;

        if ready_rx.recv().is_err() {
            cancel.cancel();
            if join.join().is_err() {
                error!("Generation thread panicked before it was ready");
            }
            return Err(LiveError::NotReady);
        }

        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        info!(
            chunk_frames = self.settings.chunk_frames,
            realtime = self.settings.realtime,
            "Live session started with {}",
            snapshot
        );
        *session = Some(Session {
            cancel,
            join,
            finished,
        });
        Ok(())
    }

    /// Offers a new snapshot to the running session, to take effect at the next chunk
    /// boundary. Returns false, and does nothing, if no session is running.
    pub fn update(&self, snapshot: ParameterSnapshot) -> bool {
        if !self.is_running() {
            debug!("Ignoring parameter update, no live session");
            return false;
        }
        if self.pending.offer(snapshot) {
            debug!("Pending update superseded");
        }
        *self.last_known.lock() = snapshot;
        true
    }

    /// Stops the running session and waits for its thread to exit. Does nothing if no
    /// session is running.
    pub fn stop(&self) {
        let session = self.session.lock().take();
        if let Some(session) = session {
            session.shutdown();
            self.pending.take();
            info!("Live session stopped");
        }
    }

    pub fn state(&self) -> SessionState {
        match self.session.lock().as_ref() {
            Some(session) if !session.is_finished() => SessionState::Running,
            _ => SessionState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Takes the error that aborted the most recent session, if any.
    pub fn take_error(&self) -> Option<LiveError> {
        self.last_error.lock().take()
    }

    /// The snapshot the next session will start with.
    pub fn last_known(&self) -> ParameterSnapshot {
        *self.last_known.lock()
    }

    /// Number of sessions started over the controller's lifetime.
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }
}

impl Drop for LiveController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The generation loop. Runs until cancelled or until the sink refuses a chunk.
fn run_session(context: SessionContext) {
    let span = span!(Level::INFO, "live session");
    let _enter = span.enter();

    if let Some(priority) = context.priority {
        configure_generation_thread_priority(priority, context.rt_audio);
    }

    let settings = context.settings;
    let mut generator = Generator::new(context.snapshot, settings.chunk_frames, settings.max_voices);
    let chunk_duration = AudioFormat::ENGINE.duration_of(generator.chunk_frames());
    let mut deadline = Instant::now();

    while !context.cancel.is_cancelled() {
        let chunk = generator.next_chunk(&context.pending);
        if chunk.retuned {
            info!(chunk = generator.chunks(), "Applied {}", generator.snapshot());
        }

        if let Err(e) = context.sink.push(chunk.audio, settings.sink_timeout) {
            error!(
                err = %e,
                chunks = generator.chunks(),
                "Output sink refused chunk, aborting session"
            );
            *context.last_error.lock() = Some(LiveError::Sink(e));
            break;
        }

        if settings.realtime {
            deadline += chunk_duration;
            let now = Instant::now();
            if deadline > now && context.cancel.wait_timeout(deadline - now) {
                break;
            }
        }
    }

    context.finished.store(true, Ordering::Release);
    info!(chunks = generator.chunks(), "Generation loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::RecordingSink;
    use crate::params::{normalize, RawParameters};
    use crate::testutil::eventually;

    fn settings() -> LiveSettings {
        LiveSettings {
            chunk_frames: 256,
            sink_timeout: Duration::from_millis(20),
            ..LiveSettings::default()
        }
    }

    fn controller(sink: Arc<RecordingSink>) -> LiveController {
        LiveController::new(sink, settings(), ParameterSnapshot::default())
    }

    #[test]
    fn test_start_is_idempotent() {
        let sink = Arc::new(RecordingSink::new("mock"));
        let live = controller(sink.clone());
        assert_eq!(live.state(), SessionState::Stopped);

        live.start().expect("start");
        live.start().expect("second start");
        assert_eq!(live.sessions_started(), 1);
        assert!(live.is_running());

        eventually(|| sink.len() > 3, "No chunks were produced");
        live.stop();
        live.stop();
        assert_eq!(live.state(), SessionState::Stopped);
        assert!(live.take_error().is_none());
    }

    #[test]
    fn test_stop_when_never_started() {
        let live = controller(Arc::new(RecordingSink::new("mock")));
        live.stop();
        assert_eq!(live.state(), SessionState::Stopped);
    }

    #[test]
    fn test_update_while_stopped_is_a_no_op() {
        let sink = Arc::new(RecordingSink::new("mock"));
        let live = controller(sink.clone());
        let update = normalize(&RawParameters {
            tempo_bpm: 150.0,
            ..RawParameters::default()
        });

        assert!(!live.update(update));
        assert_eq!(live.state(), SessionState::Stopped);
        assert_eq!(live.last_known(), ParameterSnapshot::default());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_update_while_running() {
        let sink = Arc::new(RecordingSink::new("mock"));
        let live = controller(sink.clone());
        live.start().expect("start");

        let update = normalize(&RawParameters {
            tempo_bpm: 150.0,
            mood: 0.9,
            ..RawParameters::default()
        });
        assert!(live.update(update));
        assert_eq!(live.last_known(), update);
        eventually(|| sink.len() > 10, "No chunks after update");
        live.stop();

        // Chunks are whole and in the fixed size.
        assert!(sink.chunks().iter().all(|chunk| chunk.frames() == 256));
    }

    #[test]
    fn test_restart_after_stop() {
        let sink = Arc::new(RecordingSink::new("mock"));
        let live = controller(sink.clone());
        live.start().expect("start");
        live.stop();
        live.start().expect("restart");
        assert!(live.is_running());
        assert_eq!(live.sessions_started(), 2);
        live.stop();
    }

    #[test]
    fn test_refusing_sink_aborts_session() {
        let sink = Arc::new(RecordingSink::new("mock"));
        sink.set_refusing(true);
        let live = controller(sink.clone());
        live.start().expect("start");

        eventually(|| !live.is_running(), "Session did not abort");
        assert!(matches!(
            live.take_error(),
            Some(LiveError::Sink(SinkError::Timeout(_)))
        ));
        assert!(sink.is_empty());
        assert!(!live.update(ParameterSnapshot::default()));

        // A new session can start once the sink recovers.
        sink.set_refusing(false);
        live.start().expect("restart");
        eventually(|| !sink.is_empty(), "No chunks after restart");
        live.stop();
    }

    #[test]
    fn test_rapid_updates_coalesce_at_chunk_boundary() {
        let sink = Arc::new(RecordingSink::gated("gated"));
        let settings = LiveSettings {
            chunk_frames: 256,
            sink_timeout: Duration::from_secs(5),
            ..LiveSettings::default()
        };
        let live = LiveController::new(sink.clone(), settings, ParameterSnapshot::default());
        live.start().expect("start");

        // Hold the first chunk at the gate so every update lands before the next boundary.
        eventually(|| sink.blocked_pushes() == 1, "First chunk never reached the sink");
        let updates = [(100.0, 0.1), (140.0, 0.5), (180.0, 0.9)].map(|(tempo_bpm, mood)| {
            normalize(&RawParameters {
                tempo_bpm,
                mood,
                percussion_level: 1.0,
                ..RawParameters::default()
            })
        });
        for update in updates {
            assert!(live.update(update));
        }
        assert_eq!(live.last_known(), updates[2]);

        sink.release(3);
        eventually(|| sink.len() >= 3, "Chunks were not delivered");
        sink.release(1000);
        live.stop();

        // Only the last update is ever heard, starting exactly at the second chunk.
        let pending = PendingSlot::new();
        let mut expected = Generator::new(ParameterSnapshot::default(), 256, DEFAULT_MAX_VOICES);
        let first = expected.next_chunk(&pending);
        pending.offer(updates[2]);
        let second = expected.next_chunk(&pending);
        assert!(second.retuned);
        let third = expected.next_chunk(&pending);

        let chunks = sink.chunks();
        assert_eq!(chunks[0], first.audio);
        assert_eq!(chunks[1], second.audio);
        assert_eq!(chunks[2], third.audio);
    }

    #[test]
    fn test_realtime_pacing() {
        let sink = Arc::new(RecordingSink::new("mock"));
        let live = LiveController::new(
            sink.clone(),
            LiveSettings {
                chunk_frames: 4410,
                realtime: true,
                ..LiveSettings::default()
            },
            ParameterSnapshot::default(),
        );
        live.start().expect("start");
        thread::sleep(Duration::from_millis(250));
        live.stop();

        // 100 ms chunks paced to real time: a handful, not hundreds.
        let chunks = sink.len();
        assert!((1..=6).contains(&chunks), "{} chunks in 250 ms", chunks);
    }
}
