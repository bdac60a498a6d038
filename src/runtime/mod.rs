//! Two-thread orchestration: the control-side façade, the worker event loop,
//! and the protocol, timers, surfaces and render loop they share.

mod clock;
mod control;
mod fps;
mod input;
mod message;
mod port;
mod render;
mod surface;
mod wire;
mod worker;

pub use clock::{ClockHandle, DisplayLink, SimulationClock};
pub use control::{ControlError, Controller, FpsUpdate, SessionStatus, SurfaceMode};
pub use fps::FpsMeter;
pub use input::{BackingSize, ElementRect, GridCell, GridGeometry, PointerPosition, map_pointer};
pub use message::{InitPayload, Message, MessageKind, RenderPayload, TogglePayload};
pub use port::{Port, PortClosed, PostedMessage, Transferable, channel};
pub use render::{CellSprite, RenderError, RenderLoop, Stage};
pub use surface::{Canvas, ImageBitmap, OffscreenSurface, Pixmap, Rgba, SurfaceError};
pub use wire::{ProtocolError, decode, encode};
pub use worker::{Session, WorkerError, WorkerOptions, run, spawn};
