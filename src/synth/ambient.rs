//! Ambient noise bed ("breeze").
//!
//! Each `start` creates one [`NoiseSession`] that walks
//! Init -> Installing -> Active -> TornDown. Installing first tries the
//! worklet path; any failure there falls back to the buffered renderer, and a
//! failure of the fallback abandons the session. Nothing is ever reported to
//! the caller.

use super::noise::{FallbackRenderer, FallbackWorker};
use crate::config::{EngineConfig, OverlapPolicy};
use crate::error::AudioError;
use crate::graph::{AudioParam, Connection, GainNode, ParamHandle, ParamTimeline, Source};
use crate::runtime::worklet::NOISE_PROCESSOR_NAME;
use crate::runtime::{AudioContext, AudioContextManager, Scheduler, TimerId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_AMBIENT_MS: u64 = 2000;
pub const AMBIENT_PEAK_GAIN: f32 = 0.1;
pub const FADE_IN_SECONDS: f64 = 0.5;
/// Fade applied to a session replaced under [`OverlapPolicy::Restart`].
pub const RESTART_FADE_SECONDS: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererPath {
    Worklet,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Installing,
    Active,
    TornDown,
}

/// Gain ramp of a session: 0 at `start`, up to 0.1 after the fade-in, back to
/// 0 exactly at `start + duration`. Sessions shorter than twice the fade-in
/// spend half their length rising.
pub fn ambient_gain_timeline(start: f64, duration_secs: f64) -> ParamTimeline {
    let fade_in = FADE_IN_SECONDS.min(duration_secs / 2.0);
    let mut timeline = ParamTimeline::new(0.0);
    timeline
        .set_value_at_time(0.0, start)
        .linear_ramp_to_value_at_time(AMBIENT_PEAK_GAIN, start + fade_in)
        .linear_ramp_to_value_at_time(0.0, start + duration_secs);
    timeline
}

struct SessionInner {
    state: SessionState,
    path: Option<RendererPath>,
    start_time: Option<f64>,
    envelope: Option<ParamTimeline>,
    link: Option<Connection>,
    gain: Option<ParamHandle>,
    teardown: Option<TimerId>,
    worker: Option<FallbackWorker>,
    superseded: bool,
}

/// One bounded playback of the noise bed.
pub struct NoiseSession {
    id: u64,
    duration_ms: u64,
    started_at: Instant,
    inner: Mutex<SessionInner>,
}

impl NoiseSession {
    fn new(id: u64, duration_ms: u64) -> Self {
        Self {
            id,
            duration_ms,
            started_at: Instant::now(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Init,
                path: None,
                start_time: None,
                envelope: None,
                link: None,
                gain: None,
                teardown: None,
                worker: None,
                superseded: false,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn renderer_path(&self) -> Option<RendererPath> {
        self.inner.lock().path
    }

    /// Context time at which the gain ramp started.
    pub fn start_time(&self) -> Option<f64> {
        self.inner.lock().start_time
    }

    /// The gain ramp scheduled when the session went active, including any
    /// restart fade applied since.
    pub fn gain_envelope(&self) -> Option<ParamTimeline> {
        self.inner.lock().envelope.clone()
    }

    /// Whether the fallback callback thread has exited. `None` unless the
    /// session ran on the fallback path.
    pub fn fallback_finished(&self) -> Option<bool> {
        self.inner.lock().worker.as_ref().map(FallbackWorker::is_finished)
    }

    pub fn is_torn_down(&self) -> bool {
        self.state() == SessionState::TornDown
    }

    /// Blocks until the session is torn down or `timeout` passes. Meant for
    /// hosts and tests that need to wait; play paths never call it.
    pub fn wait_torn_down(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_torn_down() {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        true
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Time left until teardown, measured from when `start` was called.
    fn remaining(&self) -> Duration {
        self.duration().saturating_sub(self.started_at.elapsed())
    }

    fn set_state(&self, state: SessionState) {
        let mut inner = self.inner.lock();
        if inner.state != SessionState::TornDown {
            inner.state = state;
        }
    }

    /// Records the connected nodes. Returns false if the session was replaced
    /// meanwhile, in which case it is torn down on the spot.
    fn activate(
        &self,
        path: RendererPath,
        start_time: f64,
        envelope: ParamTimeline,
        link: Connection,
        gain: ParamHandle,
        worker: Option<FallbackWorker>,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.superseded || inner.state == SessionState::TornDown {
            link.disconnect();
            inner.state = SessionState::TornDown;
            debug!("Ambient session {} replaced before it became active", self.id);
            return false;
        }
        inner.state = SessionState::Active;
        inner.path = Some(path);
        inner.start_time = Some(start_time);
        inner.envelope = Some(envelope);
        inner.link = Some(link);
        inner.gain = Some(gain);
        inner.worker = worker;
        info!("Ambient session {} active via {:?} path", self.id, path);
        true
    }

    fn set_teardown_timer(&self, timer: TimerId) {
        self.inner.lock().teardown = Some(timer);
    }

    fn tear_down(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::TornDown {
            return;
        }
        if let Some(link) = inner.link.take() {
            link.disconnect();
        }
        inner.gain = None;
        inner.teardown = None;
        inner.state = SessionState::TornDown;
        info!("Ambient session {} torn down", self.id);
    }

    /// Quickly fades this session out in favour of a newer one.
    fn supersede(self: &Arc<Self>, scheduler: &Scheduler, now: Option<f64>) {
        let mut inner = self.inner.lock();
        match inner.state {
            SessionState::TornDown => {}
            SessionState::Init | SessionState::Installing => inner.superseded = true,
            SessionState::Active => {
                inner.superseded = true;
                if let Some(now) = now {
                    if let Some(gain) = &inner.gain {
                        gain.cancel_and_hold_at_time(now);
                        gain.linear_ramp_to_value_at_time(0.0, now + RESTART_FADE_SECONDS);
                    }
                    if let Some(envelope) = inner.envelope.as_mut() {
                        envelope
                            .cancel_and_hold_at_time(now)
                            .linear_ramp_to_value_at_time(0.0, now + RESTART_FADE_SECONDS);
                    }
                }
                if let Some(timer) = inner.teardown.take() {
                    scheduler.cancel(timer);
                }
                let session = self.clone();
                inner.teardown = Some(scheduler.schedule(
                    Duration::from_secs_f64(RESTART_FADE_SECONDS),
                    move || session.tear_down(),
                ));
                debug!("Ambient session {} fading out for restart", self.id);
            }
        }
    }
}

/// Owns ambient sessions: installs a renderer, ramps its gain and tears it
/// down once its duration has elapsed.
#[derive(Clone)]
pub struct AmbientNoiseController {
    contexts: Arc<AudioContextManager>,
    scheduler: Arc<Scheduler>,
    module: String,
    overlap: OverlapPolicy,
    current: Arc<Mutex<Option<Arc<NoiseSession>>>>,
    next_id: Arc<AtomicU64>,
}

impl AmbientNoiseController {
    pub fn new(
        contexts: Arc<AudioContextManager>,
        scheduler: Arc<Scheduler>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            contexts,
            scheduler,
            module: config.noise_module.clone(),
            overlap: config.ambient_overlap,
            current: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Starts a session and returns immediately; installation happens on the
    /// timer thread.
    pub fn start(&self, duration_ms: u64) -> Arc<NoiseSession> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(NoiseSession::new(id, duration_ms));

        let previous = self.current.lock().replace(session.clone());
        if let (OverlapPolicy::Restart, Some(previous)) = (self.overlap, previous) {
            let now = self.contexts.try_get().map(|c| c.current_time());
            previous.supersede(&self.scheduler, now);
        }

        if duration_ms == 0 {
            warn!("Ignoring ambient session with zero duration");
            session.tear_down();
            return session;
        }

        let controller = self.clone();
        let pending = session.clone();
        self.scheduler
            .schedule(Duration::ZERO, move || controller.run_session(&pending));
        session
    }

    fn run_session(&self, session: &Arc<NoiseSession>) {
        let context = match self.contexts.get() {
            Ok(context) => context,
            Err(err) => {
                error!("Ambient noise unavailable: {}", err);
                session.tear_down();
                return;
            }
        };

        session.set_state(SessionState::Installing);
        let installed = self.install_worklet(&context, session).or_else(|err| {
            warn!("Worklet renderer unavailable ({}), using buffered fallback", err);
            self.install_fallback(&context, session)
        });

        if let Err(err) = installed {
            error!("Ambient noise abandoned: {}", err);
            session.tear_down();
        }
    }

    fn install_worklet(&self, context: &AudioContext, session: &Arc<NoiseSession>) -> Result<(), AudioError> {
        let worklet = context.audio_worklet();
        worklet.add_module(&self.module)?;
        let node = worklet.create_node(NOISE_PROCESSOR_NAME)?;
        self.connect(context, session, RendererPath::Worklet, Box::new(node), Connection::new(), None);
        Ok(())
    }

    fn install_fallback(&self, context: &AudioContext, session: &Arc<NoiseSession>) -> Result<(), AudioError> {
        let link = Connection::new();
        let (node, worker) = FallbackRenderer::new().spawn(link.clone())?;
        self.connect(context, session, RendererPath::Fallback, Box::new(node), link, Some(worker));
        Ok(())
    }

    /// Routes `source` through a fresh gain node and schedules teardown.
    fn connect(
        &self,
        context: &AudioContext,
        session: &Arc<NoiseSession>,
        path: RendererPath,
        source: Box<dyn Source>,
        link: Connection,
        worker: Option<FallbackWorker>,
    ) {
        let now = context.current_time();
        let envelope = ambient_gain_timeline(now, session.duration().as_secs_f64());
        let gain = AudioParam::from_timeline(envelope.clone());
        let handle = gain.handle();
        context.connect_with(Box::new(GainNode::new(source, gain)), link.clone());

        if !session.activate(path, now, envelope, link, handle, worker) {
            return;
        }
        let pending = session.clone();
        let timer = self
            .scheduler
            .schedule(session.remaining(), move || pending.tear_down());
        session.set_teardown_timer(timer);
    }

    /// The most recently started session.
    pub fn current(&self) -> Option<Arc<NoiseSession>> {
        self.current.lock().clone()
    }
}
