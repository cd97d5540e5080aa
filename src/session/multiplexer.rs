//! Session multiplexer.
//!
//! A single inbound reader submits raw frames; any number of callers wait on
//! their own session id. Each session is a FIFO queue backed by an unbounded
//! crossbeam channel. Frames for session ids nobody registered yet are
//! buffered up to `speculative_capacity` so that a caller registering late
//! still sees them. At most `max_speculative_sessions` such ids are buffered
//! at once; the oldest is evicted first.

use crate::protocol::{decode, Frame};
use crate::utils::config::{
    DEFAULT_COMPLETED_HISTORY, DEFAULT_MAX_SPECULATIVE_SESSIONS, DEFAULT_SPECULATIVE_CAPACITY,
};
use crate::utils::error::MuxError;
use crossbeam_channel::{self as cb, select, Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Multiplexer tuning
#[derive(Debug, Clone)]
pub struct MultiplexerConfig {
    /// Frames buffered per unregistered session id before dropping
    pub speculative_capacity: usize,
    /// Unregistered session ids buffered at once
    pub max_speculative_sessions: usize,
    /// Completed session ids remembered by `is_complete`
    pub completed_history: usize,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            speculative_capacity: DEFAULT_SPECULATIVE_CAPACITY,
            max_speculative_sessions: DEFAULT_MAX_SPECULATIVE_SESSIONS,
            completed_history: DEFAULT_COMPLETED_HISTORY,
        }
    }
}

impl MultiplexerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_speculative_capacity(mut self, capacity: usize) -> Self {
        self.speculative_capacity = capacity;
        self
    }

    pub fn with_max_speculative_sessions(mut self, max: usize) -> Self {
        self.max_speculative_sessions = max;
        self
    }

    pub fn with_completed_history(mut self, history: usize) -> Self {
        self.completed_history = history;
        self
    }
}

/// Outcome of waiting for a session's next frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextFrame {
    Frame(Frame),
    /// Nothing arrived within the timeout; queued frames are untouched
    Timeout,
    /// The wait or the whole session was cancelled
    Cancelled,
}

/// Where `submit` put a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Appended to a registered session's queue
    Queued,
    /// Buffered for a session id nobody registered yet
    Speculative,
    /// Discarded: no session id, completed session or buffer full
    Dropped,
}

/// Releases a single waiter without touching the session queue
///
/// Clones share state; once cancelled a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = cb::bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(tx))),
            signal: rx,
        }
    }

    pub fn cancel(&self) {
        // Dropping the only sender disconnects every clone of the receiver
        self.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        is_disconnected(&self.signal)
    }
}

struct SessionSlot {
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    registered: bool,
    /// Registered through `register`; never dropped for idling
    pinned: bool,
    waiters: usize,
    /// Dropped with the slot, which wakes every waiter through `closed`
    _alive: Sender<()>,
    closed: Receiver<()>,
}

impl SessionSlot {
    fn new(registered: bool) -> Self {
        let (tx, rx) = cb::unbounded();
        let (alive, closed) = cb::bounded(0);
        Self {
            tx,
            rx,
            registered,
            pinned: false,
            waiters: 0,
            _alive: alive,
            closed,
        }
    }
}

#[derive(Default)]
struct State {
    sessions: HashMap<String, SessionSlot>,
    /// Unregistered slots, oldest first
    speculative_order: VecDeque<String>,
    completed: HashSet<String>,
    completed_order: VecDeque<String>,
}

impl State {
    /// Mark a session registered, creating its slot if needed
    fn claim(&mut self, session_id: &str) -> &mut SessionSlot {
        let slot = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionSlot::new(true));
        if !slot.registered {
            debug!(
                "Session {} registered with {} buffered frame(s)",
                session_id,
                slot.rx.len()
            );
            slot.registered = true;
            self.speculative_order.retain(|id| id != session_id);
        }
        slot
    }

    fn remove(&mut self, session_id: &str) -> Option<SessionSlot> {
        let slot = self.sessions.remove(session_id)?;
        if !slot.registered {
            self.speculative_order.retain(|id| id != session_id);
        }
        Some(slot)
    }

    /// Drop the oldest unregistered slots until at most `keep` remain
    fn evict_speculative(&mut self, keep: usize) {
        while self.speculative_order.len() > keep {
            let Some(oldest) = self.speculative_order.pop_front() else {
                break;
            };
            if let Some(slot) = self.sessions.remove(&oldest) {
                warn!(
                    "Evicting unregistered session {} ({} buffered frame(s) discarded)",
                    oldest,
                    slot.rx.len()
                );
            }
        }
    }

    fn remember_completed(&mut self, session_id: &str, history: usize) {
        if self.completed.insert(session_id.to_string()) {
            self.completed_order.push_back(session_id.to_string());
        }
        while self.completed_order.len() > history {
            if let Some(oldest) = self.completed_order.pop_front() {
                self.completed.remove(&oldest);
            }
        }
    }
}

/// Routes decoded frames to per-session FIFO queues
#[derive(Default)]
pub struct Multiplexer {
    config: MultiplexerConfig,
    state: Mutex<State>,
}

impl Multiplexer {
    pub fn new(config: MultiplexerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    /// Start tracking a session, adopting any speculatively buffered frames
    ///
    /// Registering a previously completed id starts it afresh.
    pub fn register(&self, session_id: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.completed.remove(session_id) {
            state.completed_order.retain(|id| id != session_id);
        }
        state.claim(session_id).pinned = true;
    }

    /// Decode a raw frame and route it by session id
    pub fn submit(&self, raw: &str) -> Routing {
        self.route(decode(raw))
    }

    /// Route an already decoded frame
    pub fn route(&self, frame: Frame) -> Routing {
        if frame.session_id.is_empty() {
            warn!("Dropping frame without session id: {}", frame.body);
            return Routing::Dropped;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.completed.contains(&frame.session_id) {
            debug!(
                "Dropping {:?} frame for completed session {}",
                frame.response_type, frame.session_id
            );
            return Routing::Dropped;
        }

        if !state.sessions.contains_key(&frame.session_id) {
            let max = self.config.max_speculative_sessions;
            if max == 0 {
                debug!("Dropping frame for unregistered session {}", frame.session_id);
                return Routing::Dropped;
            }
            state.evict_speculative(max - 1);
            debug!("Buffering frames for unregistered session {}", frame.session_id);
            state
                .sessions
                .insert(frame.session_id.clone(), SessionSlot::new(false));
            state.speculative_order.push_back(frame.session_id.clone());
        }

        let capacity = self.config.speculative_capacity;
        let Some(slot) = state.sessions.get_mut(&frame.session_id) else {
            return Routing::Dropped;
        };

        let routing = if slot.registered {
            Routing::Queued
        } else if slot.rx.len() >= capacity {
            warn!(
                "Speculative buffer full for session {}, dropping {:?} frame",
                frame.session_id, frame.response_type
            );
            return Routing::Dropped;
        } else {
            Routing::Speculative
        };

        // The slot owns a receiver, so an unbounded send cannot fail
        let _ = slot.tx.send(frame);
        routing
    }

    /// Wait up to `timeout` for the session's next frame
    ///
    /// Registers the session if needed. A session not registered through
    /// [`Multiplexer::register`] stops being tracked when the wait times out
    /// with nothing queued. Frames come out in submission order.
    /// Receiving the COMMAND_END frame completes the session.
    ///
    /// # Errors
    /// * `MuxError::SessionClosed` - the session already completed
    pub fn next_frame(&self, session_id: &str, timeout: Duration) -> Result<NextFrame, MuxError> {
        self.wait(session_id, timeout, None)
    }

    /// Like [`Multiplexer::next_frame`], released early when `token` is cancelled
    pub fn next_frame_cancellable(
        &self,
        session_id: &str,
        timeout: Duration,
        token: &CancelToken,
    ) -> Result<NextFrame, MuxError> {
        self.wait(session_id, timeout, Some(token))
    }

    fn wait(
        &self,
        session_id: &str,
        timeout: Duration,
        token: Option<&CancelToken>,
    ) -> Result<NextFrame, MuxError> {
        let (frames, closed) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.completed.contains(session_id) {
                return Err(MuxError::SessionClosed(session_id.to_string()));
            }
            let slot = state.claim(session_id);
            slot.waiters += 1;
            (slot.rx.clone(), slot.closed.clone())
        };

        let outcome = if token.is_some_and(CancelToken::is_cancelled) {
            NextFrame::Cancelled
        } else {
            let never = cb::never();
            let cancelled = token.map(|t| &t.signal).unwrap_or(&never);

            select! {
                recv(frames) -> msg => match msg {
                    Ok(frame) if !is_disconnected(&closed) => NextFrame::Frame(frame),
                    _ => NextFrame::Cancelled,
                },
                recv(closed) -> _ => NextFrame::Cancelled,
                recv(cancelled) -> _ => NextFrame::Cancelled,
                default(timeout) => NextFrame::Timeout,
            }
        };

        self.release(session_id, &frames, &outcome);
        Ok(outcome)
    }

    /// Undo a waiter's hold on its slot
    ///
    /// A slot nobody pinned with `register` is dropped once a wait on it times
    /// out with an empty queue and no other waiter.
    fn release(&self, session_id: &str, frames: &Receiver<Frame>, outcome: &NextFrame) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(slot) = state.sessions.get_mut(session_id) else {
            return;
        };
        if !slot.rx.same_channel(frames) {
            return;
        }
        slot.waiters = slot.waiters.saturating_sub(1);
        let idle = !slot.pinned && slot.waiters == 0 && slot.rx.is_empty();

        match outcome {
            NextFrame::Frame(frame) if frame.is_command_end() => {
                self.complete(state, session_id);
            }
            NextFrame::Timeout if idle => {
                state.sessions.remove(session_id);
                debug!("Session {} idle after timeout, no longer tracked", session_id);
            }
            _ => {}
        }
    }

    fn complete(&self, state: &mut State, session_id: &str) {
        if let Some(slot) = state.remove(session_id) {
            let leftover = slot.rx.len();
            if leftover > 0 {
                warn!(
                    "Session {} ended with {} undelivered frame(s)",
                    session_id, leftover
                );
            }
        }
        state.remember_completed(session_id, self.config.completed_history);
        debug!("Session {} completed", session_id);
    }

    /// Whether the session's COMMAND_END frame has been delivered
    pub fn is_complete(&self, session_id: &str) -> bool {
        self.state.lock().completed.contains(session_id)
    }

    /// Discard a session's queue and stop tracking it
    ///
    /// Every waiter on the session is released with `NextFrame::Cancelled`.
    /// Returns `false` if the session was not tracked.
    pub fn cancel(&self, session_id: &str) -> bool {
        let removed = self.state.lock().remove(session_id);
        match removed {
            Some(slot) => {
                info!(
                    "Cancelled session {} ({} queued frame(s) discarded)",
                    session_id,
                    slot.rx.len()
                );
                true
            }
            None => false,
        }
    }

    /// Frames queued for a session
    pub fn pending(&self, session_id: &str) -> usize {
        self.state
            .lock()
            .sessions
            .get(session_id)
            .map_or(0, |slot| slot.rx.len())
    }

    pub fn is_tracked(&self, session_id: &str) -> bool {
        self.state.lock().sessions.contains_key(session_id)
    }

    /// Number of live (registered or speculative) sessions
    pub fn session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }
}

fn is_disconnected<T>(rx: &Receiver<T>) -> bool {
    matches!(rx.try_recv(), Err(TryRecvError::Disconnected))
}
