//! Control-thread façade over the worker.
//!
//! The [`Controller`] owns the page-side [`Canvas`], spawns the worker, and
//! turns user gestures into protocol messages. Nothing here waits on the
//! worker: outbound messages are queued and inbound frames are drained with
//! [`Controller::poll`].

use std::io;
use std::thread::JoinHandle;

use super::input::{BackingSize, ElementRect, GridCell, GridGeometry, PointerPosition, map_pointer};
use super::message::{InitPayload, Message, MessageKind, RenderPayload, TogglePayload};
use super::port::{Port, PortClosed, PostedMessage, channel};
use super::surface::{Canvas, SurfaceError};
use super::wire::{self, ProtocolError};
use super::worker::{self, WorkerError, WorkerOptions};
use crate::compute::{Automaton, Universe};
use crate::schema::{ConfigError, SessionConfig};

/// Who owns the drawable for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceMode {
    /// The canvas is transferred to the worker, which draws in place.
    Worker,
    /// The canvas stays here; the worker ships finished frames as bitmaps.
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Worker spawned, `Init` not yet sent.
    Idle,
    Running,
    /// The worker ended the session or sent something unusable.
    Failed,
    /// Shut down from this side.
    Closed,
}

/// One drained `Render` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsUpdate {
    pub fps: u32,
    /// Whether a frame bitmap was committed to the canvas with it.
    pub frame_committed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Session has not been initialized")]
    NotInitialized,
    #[error("Session is already initialized")]
    AlreadyInitialized,
    #[error("Session is closed")]
    SessionClosed,
    #[error("Invalid session configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Surface transfer failed: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("Worker failed: {0}")]
    Worker(#[from] WorkerError),
    #[error("Worker thread panicked")]
    WorkerPanicked,
}

/// Layout fixed at `Init`.
#[derive(Debug, Clone, Copy)]
struct Attached {
    mode: SurfaceMode,
    grid: GridGeometry,
    surface: BackingSize,
}

pub struct Controller {
    canvas: Canvas,
    element: Option<ElementRect>,
    port: Option<Port>,
    worker: Option<JoinHandle<Result<(), WorkerError>>>,
    attached: Option<Attached>,
    status: SessionStatus,
    paused: bool,
    fps: u32,
}

impl Controller {
    /// Spawn a worker running the reference [`Universe`].
    pub fn spawn(canvas: Canvas) -> Result<Self, ControlError> {
        Self::spawn_with::<Universe>(canvas, WorkerOptions::default())
    }

    /// Spawn a worker running automaton `A`.
    pub fn spawn_with<A: Automaton + 'static>(
        canvas: Canvas,
        options: WorkerOptions,
    ) -> Result<Self, ControlError> {
        let (control, remote) = channel();
        let handle = worker::spawn::<A>(remote, options).map_err(ControlError::Spawn)?;
        log::debug!("Worker spawned");

        Ok(Self {
            canvas,
            element: None,
            port: Some(control),
            worker: Some(handle),
            attached: None,
            status: SessionStatus::Idle,
            paused: false,
            fps: 0,
        })
    }

    /// Start the session. Sends `Init` exactly once.
    ///
    /// In [`SurfaceMode::Worker`] the canvas is detached here; a failed
    /// transfer aborts before anything is sent. In [`SurfaceMode::Control`]
    /// the canvas backing store is sized to the grid's drawable.
    pub fn initialize(
        &mut self,
        config: &SessionConfig,
        mode: SurfaceMode,
    ) -> Result<(), ControlError> {
        self.ensure_open()?;
        if self.attached.is_some() {
            return Err(ControlError::AlreadyInitialized);
        }
        config.validate()?;
        let (width, height) = config.surface_size().ok_or(ConfigError::SurfaceTooLarge {
            width: config.width,
            height: config.height,
            cell_size: config.cell_size,
        })?;

        let surface = match mode {
            SurfaceMode::Worker => Some(self.canvas.transfer_control_to_offscreen()?),
            SurfaceMode::Control => {
                self.canvas.resize(width, height)?;
                None
            }
        };

        self.post(Message::Init(InitPayload::from_config(config, surface)))?;
        self.attached = Some(Attached {
            mode,
            grid: GridGeometry::from(config),
            surface: BackingSize { width, height },
        });
        self.status = SessionStatus::Running;
        log::info!(
            "Session initialized: {}x{} cells, {:?}-owned surface",
            config.width,
            config.height,
            mode
        );
        Ok(())
    }

    /// Flip the cell under a pointer at client coordinates `(client_x, client_y)`.
    pub fn toggle_cell(&mut self, client_x: f64, client_y: f64) -> Result<GridCell, ControlError> {
        self.ensure_open()?;
        let attached = self.attached.ok_or(ControlError::NotInitialized)?;

        let backing = match attached.mode {
            SurfaceMode::Control => BackingSize {
                width: self.canvas.width(),
                height: self.canvas.height(),
            },
            SurfaceMode::Worker => attached.surface,
        };
        let cell = map_pointer(
            PointerPosition {
                x: client_x,
                y: client_y,
            },
            self.element(),
            backing,
            attached.grid,
        );

        self.post(Message::Toggle(TogglePayload {
            row: cell.row,
            col: cell.col,
        }))?;
        Ok(cell)
    }

    /// Pause or resume the simulation clock. Rendering continues either way.
    pub fn set_paused(&mut self, paused: bool) -> Result<(), ControlError> {
        self.ensure_open()?;
        if self.attached.is_none() {
            return Err(ControlError::NotInitialized);
        }
        self.post(Message::Pause(paused))?;
        self.paused = paused;
        Ok(())
    }

    /// Record the element's rendered box. Only pointer mapping uses it.
    pub fn resize_element(&mut self, rect: ElementRect) {
        self.element = Some(rect);
    }

    /// The element's rendered box; unscaled at the origin until resized.
    pub fn element(&self) -> ElementRect {
        self.element.unwrap_or_else(|| {
            let (width, height) = match self.attached {
                Some(Attached {
                    mode: SurfaceMode::Worker,
                    surface,
                    ..
                }) => (surface.width, surface.height),
                _ => (self.canvas.width(), self.canvas.height()),
            };
            ElementRect::sized(f64::from(width), f64::from(height))
        })
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Drain pending `Render` messages without blocking.
    ///
    /// Frames are committed to the canvas in arrival order. A closed port or
    /// an unusable message fails the session.
    pub fn poll(&mut self) -> Vec<FpsUpdate> {
        let Some(port) = &self.port else {
            return Vec::new();
        };

        let mut inbox = Vec::new();
        let closed = loop {
            match port.try_recv() {
                Ok(Some(posted)) => inbox.push(posted),
                Ok(None) => break false,
                Err(PortClosed) => break true,
            }
        };

        let mut updates = Vec::with_capacity(inbox.len());
        for posted in inbox {
            match self.accept(posted) {
                Ok(update) => {
                    self.fps = update.fps;
                    updates.push(update);
                }
                Err(err) => {
                    log::error!("Dropping session after bad worker message: {err}");
                    self.fail();
                    return updates;
                }
            }
        }

        if closed && self.status != SessionStatus::Failed {
            log::error!("Worker closed its port");
            self.fail();
        }
        updates
    }

    /// Latest frame rate reported by the worker.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Close the port and wait for the worker to exit.
    ///
    /// Returns the worker's own error if it ended the session.
    pub fn shutdown(mut self) -> Result<(), ControlError> {
        self.close()
    }

    fn accept(&mut self, posted: PostedMessage) -> Result<FpsUpdate, ControlError> {
        let payload = match wire::decode(posted)? {
            Message::Render(payload) => payload,
            other => return Err(ProtocolError::WrongDirection(other.kind()).into()),
        };
        let attached = self
            .attached
            .ok_or(ProtocolError::NotInitialized(MessageKind::Render))?;

        match (attached.mode, payload) {
            (SurfaceMode::Worker, RenderPayload::Fps(fps)) => Ok(FpsUpdate {
                fps,
                frame_committed: false,
            }),
            (SurfaceMode::Control, RenderPayload::Frame { fps, bitmap }) => {
                self.canvas.transfer_from_image_bitmap(bitmap)?;
                Ok(FpsUpdate {
                    fps,
                    frame_committed: true,
                })
            }
            (mode, _) => Err(ProtocolError::InconsistentPayload {
                kind: MessageKind::Render,
                reason: match mode {
                    SurfaceMode::Worker => "frame sent for a worker-owned surface",
                    SurfaceMode::Control => "frame missing for a control-owned surface",
                },
            }
            .into()),
        }
    }

    fn post(&mut self, message: Message) -> Result<(), ControlError> {
        let posted = wire::encode(message)?;
        self.send(posted)
    }

    fn send(&mut self, posted: PostedMessage) -> Result<(), ControlError> {
        let port = self.port.as_ref().ok_or(ControlError::SessionClosed)?;
        if port.post(posted).is_err() {
            log::error!("Worker port closed while posting");
            self.fail();
            return Err(ControlError::SessionClosed);
        }
        Ok(())
    }

    /// A running session wired to `port` with no worker thread behind it.
    #[cfg(test)]
    fn attached_to(port: Port, config: &SessionConfig, mode: SurfaceMode) -> Self {
        let (width, height) = config.surface_size().unwrap();
        Self {
            canvas: Canvas::new(width, height),
            element: None,
            port: Some(port),
            worker: None,
            attached: Some(Attached {
                mode,
                grid: GridGeometry::from(config),
                surface: BackingSize { width, height },
            }),
            status: SessionStatus::Running,
            paused: false,
            fps: 0,
        }
    }

    #[cfg(test)]
    fn post_raw(&mut self, posted: PostedMessage) -> Result<(), ControlError> {
        self.send(posted)
    }

    fn ensure_open(&self) -> Result<(), ControlError> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Running => Ok(()),
            SessionStatus::Failed | SessionStatus::Closed => Err(ControlError::SessionClosed),
        }
    }

    fn fail(&mut self) {
        self.status = SessionStatus::Failed;
    }

    fn close(&mut self) -> Result<(), ControlError> {
        // Dropping the port is the worker's signal to tear down.
        self.port = None;
        if self.status != SessionStatus::Failed {
            self.status = SessionStatus::Closed;
        }
        match self.worker.take() {
            Some(handle) => match handle.join() {
                Ok(result) => result.map_err(ControlError::from),
                Err(_) => Err(ControlError::WorkerPanicked),
            },
            None => Ok(()),
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::warn!("Worker ended with an error: {err}");
        }
    }
}
