//! Worker thread - owns the automaton, the simulation clock and the render
//! loop, and multiplexes them with the inbound message port on one event
//! loop.
//!
//! Nothing here is shared with the control thread except through the port.
//! The clock and the render loop interleave on this thread, so the automaton
//! needs no lock: a frame always reads a whole generation.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::clock::{DisplayLink, SimulationClock};
use super::message::{InitPayload, Message, MessageKind, TogglePayload};
use super::port::{Port, PortClosed};
use super::render::{RenderError, RenderLoop};
use super::wire::{self, ProtocolError};
use crate::compute::Automaton;
use crate::schema::{ConfigError, SessionConfig};

/// Errors that end a worker session.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Invalid init configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Render engine initialization failed: {0}")]
    Render(#[from] RenderError),
    #[error("Control port closed")]
    Disconnected(#[from] PortClosed),
}

/// Worker tuning that is not part of the protocol.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Interval of the display link pacing the render loop.
    pub refresh_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DisplayLink::DEFAULT_INTERVAL,
        }
    }
}

/// Everything the worker holds for one session, built by `Init`.
pub struct Session<A> {
    config: SessionConfig,
    automaton: A,
    clock: SimulationClock,
    render: RenderLoop,
}

impl<A: Automaton> Session<A> {
    /// Validate the init payload, build the automaton and the render loop,
    /// and start the clock.
    pub fn start(
        init: InitPayload,
        options: &WorkerOptions,
        now: Instant,
    ) -> Result<Self, WorkerError> {
        let (config, surface) = init.into_parts();
        config.validate()?;

        let render = RenderLoop::new(&config, surface, options.refresh_interval, now)?;
        let automaton = A::from_seed(&config.seed, config.width, config.height);
        let mut clock = SimulationClock::from_millis(config.tick_interval_ms);
        clock.start(now);

        log::info!(
            "Session started: {}x{} cells, tick every {:.2}ms",
            config.width,
            config.height,
            config.tick_interval_ms
        );

        Ok(Self {
            config,
            automaton,
            clock,
            render,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn automaton(&self) -> &A {
        &self.automaton
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn render(&self) -> &RenderLoop {
        &self.render
    }

    pub fn is_paused(&self) -> bool {
        !self.clock.is_running()
    }

    /// Earliest instant at which either driver has work.
    pub fn next_deadline(&self) -> Instant {
        match self.clock.next_deadline() {
            Some(tick) => tick.min(self.render.next_deadline()),
            None => self.render.next_deadline(),
        }
    }

    /// Apply a control message. `Init` and `Render` are not valid here.
    pub fn handle(&mut self, message: Message, now: Instant) -> Result<(), ProtocolError> {
        match message {
            Message::Toggle(toggle) => {
                self.toggle(toggle);
                Ok(())
            }
            Message::Pause(true) => {
                if let Some(handle) = self.clock.stop() {
                    log::debug!("Paused, cancelled {handle:?}");
                }
                Ok(())
            }
            Message::Pause(false) => {
                let handle = self.clock.start(now);
                log::debug!("Resumed with {handle:?}");
                Ok(())
            }
            Message::Init(_) => Err(ProtocolError::DuplicateInit),
            Message::Render(_) => Err(ProtocolError::WrongDirection(MessageKind::Render)),
        }
    }

    fn toggle(&mut self, TogglePayload { row, col }: TogglePayload) {
        let (width, height) = (self.automaton.width(), self.automaton.height());
        debug_assert!(
            row < height && col < width,
            "toggle ({row}, {col}) outside {width}x{height} grid"
        );
        if row >= height || col >= width {
            log::warn!("Clamping out-of-range toggle ({row}, {col}) into {width}x{height} grid");
        }
        self.automaton
            .toggle_cell(row.min(height - 1), col.min(width - 1));
    }

    /// Run whichever drivers are due at `now`. Returns the frame message, if
    /// a frame was rendered.
    pub fn advance(&mut self, now: Instant) -> Option<Message> {
        if self.clock.poll(now) {
            self.automaton.tick();
        }
        if self.render.poll(now) {
            let payload = self.render.frame(self.automaton.cells(), now);
            return Some(Message::Render(payload));
        }
        None
    }
}

impl<A> Drop for Session<A> {
    fn drop(&mut self) {
        self.clock.stop();
        log::debug!("Session torn down");
    }
}

/// Spawn the worker thread with automaton type `A`.
///
/// The thread ends when the control side closes its port or a protocol
/// violation occurs; either way the port is dropped, which the control side
/// observes as session end.
pub fn spawn<A: Automaton + 'static>(
    port: Port,
    options: WorkerOptions,
) -> io::Result<JoinHandle<Result<(), WorkerError>>> {
    thread::Builder::new()
        .name("life-worker".into())
        .spawn(move || run::<A>(port, options))
}

/// Worker event loop. Blocks the calling thread until the session ends.
pub fn run<A: Automaton>(port: Port, options: WorkerOptions) -> Result<(), WorkerError> {
    match event_loop::<A>(&port, &options) {
        Ok(()) | Err(WorkerError::Disconnected(_)) => {
            log::info!("Control port closed, worker exiting");
            Ok(())
        }
        Err(err) => {
            log::error!("Worker terminated: {err}");
            Err(err)
        }
    }
}

fn event_loop<A: Automaton>(port: &Port, options: &WorkerOptions) -> Result<(), WorkerError> {
    let mut session: Option<Session<A>> = None;

    loop {
        let received = match &session {
            Some(active) => {
                let wait = active.next_deadline().saturating_duration_since(Instant::now());
                port.recv_timeout(wait)?
            }
            None => Some(port.recv()?),
        };

        if let Some(posted) = received {
            let message = wire::decode(posted)?;
            let now = Instant::now();
            if let Some(active) = session.as_mut() {
                active.handle(message, now)?;
            } else {
                session = Some(initialize(message, options, now)?);
            }
        }

        if let Some(active) = session.as_mut() {
            if let Some(frame) = active.advance(Instant::now()) {
                port.post(wire::encode(frame)?)?;
            }
        }
    }
}

fn initialize<A: Automaton>(
    message: Message,
    options: &WorkerOptions,
    now: Instant,
) -> Result<Session<A>, WorkerError> {
    match message {
        Message::Init(init) => Session::start(init, options, now),
        other => Err(ProtocolError::NotInitialized(other.kind()).into()),
    }
}
