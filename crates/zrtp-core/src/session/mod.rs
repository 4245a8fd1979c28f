//! Multi-stream ZRTP session
//!
//! A session owns up to two streams. The audio stream is the master: once
//! it reaches the secure state its multi-stream parameters are copied to
//! the video stream, which is only started after it holds them.
//!
//! Each stream has its own lock so the two handshakes can run on separate
//! threads. Session-wide state (initialization, the shared parameters) sits
//! behind a separate lock taken only for setup and the hand-off.

pub mod stream;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::ZrtpConfig;
use crate::error::{Result, SessionError};
use crate::state_machine::{Event, NegotiationContext, ProcessEventResult, ZrtpState, ZrtpStateMachine};
use crate::timer::TimerId;

pub use stream::{StreamKind, ZrtpStream};

#[derive(Debug, Default)]
struct SharedState {
    initialized: bool,
    multi_stream_params: Option<Bytes>,
}

pub struct ZrtpSession<C: NegotiationContext> {
    config: ZrtpConfig,
    shared: Mutex<SharedState>,
    streams: RwLock<HashMap<StreamKind, Arc<Mutex<ZrtpStream<C>>>>>,
}

impl<C: NegotiationContext> ZrtpSession<C> {
    pub fn new(config: ZrtpConfig) -> Self {
        Self {
            config,
            shared: Mutex::new(SharedState::default()),
            streams: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ZrtpConfig {
        &self.config
    }

    /// Create the requested streams, each with a context from `factory`
    pub fn init<F>(&self, audio: bool, video: bool, mut factory: F) -> Result<()>
    where
        F: FnMut(StreamKind, &ZrtpConfig) -> std::result::Result<C, SessionError>,
    {
        let mut shared = self.shared.lock();
        if shared.initialized {
            debug!("ZRTP session already initialized");
            return Ok(());
        }
        self.config.validate()?;

        let mut streams = self.streams.write();
        for (kind, wanted) in [(StreamKind::Audio, audio), (StreamKind::Video, video)] {
            if !wanted {
                continue;
            }
            let context = factory(kind, &self.config)?;
            let machine = ZrtpStateMachine::with_timers(context, self.config.timers);
            streams.insert(kind, Arc::new(Mutex::new(ZrtpStream::new(kind, machine))));
            info!("Created ZRTP {} stream", kind);
        }
        shared.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    fn stream(&self, kind: StreamKind) -> Result<Arc<Mutex<ZrtpStream<C>>>> {
        if !self.shared.lock().initialized {
            return Err(SessionError::NotInitialized.into());
        }
        self.streams
            .read()
            .get(&kind)
            .cloned()
            .ok_or_else(|| SessionError::StreamNotConfigured(kind.to_string()).into())
    }

    /// Start a stream's handshake
    ///
    /// A slave stream without multi-stream parameters is only marked; it
    /// starts when the master becomes secure. Returns `None` when nothing
    /// was started.
    pub fn start(&self, kind: StreamKind) -> Result<Option<ProcessEventResult>> {
        let stream = self.stream(kind)?;
        let mut guard = stream.lock();
        if guard.is_stopped() {
            return Err(SessionError::StreamStopped(kind.to_string()).into());
        }
        if !guard.is_enabled() {
            debug!("ZRTP disabled on {} stream, not starting", kind);
            return Ok(None);
        }
        if guard.is_started() {
            return Ok(None);
        }

        // The stream lock is held until the pending flag is set, so a master
        // becoming secure meanwhile still sees the flag.
        if !kind.is_master() {
            let params = self.shared.lock().multi_stream_params.clone();
            match params {
                Some(params) => guard.context_mut().set_multi_stream_params(params),
                None => {
                    debug!("Deferring {} stream start until master is secure", kind);
                    guard.set_start_pending(true);
                    return Ok(None);
                }
            }
        }

        info!("Starting ZRTP on {} stream", kind);
        let result = guard.deliver(Event::SessionStart);
        drop(guard);
        self.after_event(kind, &result);
        Ok(Some(result))
    }

    /// Start a stream unless it already runs or is stopped. Video never
    /// starts before the audio stream is secure.
    pub fn start_if_not_started(&self, kind: StreamKind) -> Result<Option<ProcessEventResult>> {
        if self.is_started(kind) || self.is_stopped(kind) {
            return Ok(None);
        }
        self.start(kind)
    }

    /// Mark a stream stopped. Later events for it are rejected; timers that
    /// still fire are rejected the same way.
    pub fn stop(&self, kind: StreamKind) -> Result<()> {
        let stream = self.stream(kind)?;
        stream.lock().mark_stopped();
        info!("Stopped ZRTP on {} stream", kind);
        Ok(())
    }

    /// Shut a stream's handshake down and return it to Initial
    pub fn release(&self, kind: StreamKind) -> Result<ProcessEventResult> {
        let stream = self.stream(kind)?;
        let result = stream.lock().deliver(Event::Close);
        Ok(result)
    }

    /// Feed a received ZRTP packet to a stream
    pub fn process_incoming(&self, kind: StreamKind, data: &[u8]) -> Result<ProcessEventResult> {
        self.deliver(kind, Event::PacketReceived(data))
    }

    /// Deliver a timer expiry to a stream
    pub fn timer_fired(&self, kind: StreamKind, timer: TimerId) -> Result<ProcessEventResult> {
        self.deliver(kind, Event::TimerFired(timer))
    }

    /// Ask a secure stream to go clear
    pub fn go_clear(&self, kind: StreamKind) -> Result<ProcessEventResult> {
        self.deliver(kind, Event::GoClearRequested)
    }

    fn deliver(&self, kind: StreamKind, event: Event<'_>) -> Result<ProcessEventResult> {
        let stream = self.stream(kind)?;
        let mut guard = stream.lock();
        if guard.is_stopped() {
            debug!("Rejecting {} on stopped {} stream", event.kind(), kind);
            return Err(SessionError::StreamStopped(kind.to_string()).into());
        }
        let result = guard.deliver(event);
        drop(guard);
        self.after_event(kind, &result);
        Ok(result)
    }

    /// Hand the master's parameters to the slave once the master is secure
    fn after_event(&self, kind: StreamKind, result: &ProcessEventResult) {
        if !kind.is_master()
            || result.new_state != ZrtpState::SecureState
            || result.old_state == ZrtpState::SecureState
        {
            return;
        }

        let params = match self.stream(kind) {
            Ok(master) => master.lock().context().multi_stream_params(),
            Err(_) => None,
        };
        let params = match params {
            Some(params) => params,
            None => {
                warn!("Master stream is secure but provided no multi-stream parameters");
                return;
            }
        };
        self.shared.lock().multi_stream_params = Some(params.clone());

        let slave = match self.streams.read().get(&StreamKind::Video).cloned() {
            Some(slave) => slave,
            None => return,
        };
        let mut guard = slave.lock();
        if !guard.is_start_pending() || guard.is_started() || guard.is_stopped() || !guard.is_enabled() {
            return;
        }
        guard.context_mut().set_multi_stream_params(params);
        info!("Master secure, starting ZRTP on {} stream", guard.kind());
        let result = guard.deliver(Event::SessionStart);
        if result.is_fail() {
            // Still pending; start_if_not_started retries
            warn!(
                "Deferred start of {} stream failed, left in state {}",
                guard.kind(),
                result.new_state
            );
        }
    }

    /// Parameters published by the master stream, once secure
    pub fn multi_stream_params(&self) -> Option<Bytes> {
        self.shared.lock().multi_stream_params.clone()
    }

    pub fn set_zrtp_enabled(&self, kind: StreamKind, enabled: bool) -> Result<()> {
        self.stream(kind)?.lock().set_enabled(enabled);
        Ok(())
    }

    pub fn is_secure(&self, kind: StreamKind) -> bool {
        self.stream(kind).map(|s| s.lock().is_secure()).unwrap_or(false)
    }

    pub fn is_started(&self, kind: StreamKind) -> bool {
        self.stream(kind).map(|s| s.lock().is_started()).unwrap_or(false)
    }

    /// False for stopped streams
    pub fn is_enabled(&self, kind: StreamKind) -> bool {
        self.stream(kind)
            .map(|s| {
                let guard = s.lock();
                !guard.is_stopped() && guard.is_enabled()
            })
            .unwrap_or(false)
    }

    pub fn is_stopped(&self, kind: StreamKind) -> bool {
        self.stream(kind).map(|s| s.lock().is_stopped()).unwrap_or(false)
    }

    /// State of a live stream; `None` when missing or stopped
    pub fn current_state(&self, kind: StreamKind) -> Option<ZrtpState> {
        let stream = self.stream(kind).ok()?;
        let guard = stream.lock();
        (!guard.is_stopped()).then(|| guard.state())
    }

    /// State a live stream was in before its last transition
    pub fn previous_state(&self, kind: StreamKind) -> Option<ZrtpState> {
        let stream = self.stream(kind).ok()?;
        let guard = stream.lock();
        (!guard.is_stopped()).then(|| guard.previous_state())
    }

    /// Run `f` with exclusive access to a stream
    pub fn with_stream<R>(&self, kind: StreamKind, f: impl FnOnce(&mut ZrtpStream<C>) -> R) -> Result<R> {
        let stream = self.stream(kind)?;
        let mut guard = stream.lock();
        Ok(f(&mut guard))
    }
}
