//! Life Worker - Game of Life driven from a dedicated worker thread.
//!
//! This crate runs a Conway's Game of Life universe on a worker thread while
//! the calling (control) thread stays free for input and display. The worker
//! steps the automaton on a fixed wall-clock cadence and renders on the
//! display's cadence; the two drivers share the universe but never wait on
//! each other.
//!
//! # Architecture
//!
//! The crate is split into three main modules:
//!
//! - `schema`: Serializable session configuration, colors and seed patterns
//! - `compute`: The automaton capability trait and the reference universe
//! - `runtime`: Message protocol, surface transfer, clocks, render loop,
//!   input mapping, the worker event loop and the control façade
//!
//! # Example
//!
//! ```rust,no_run
//! use life_worker::{
//!     runtime::{Canvas, Controller, SurfaceMode},
//!     schema::SessionConfig,
//! };
//!
//! let config = SessionConfig::default();
//! let (width, height) = config.surface_size().expect("surface fits in u32");
//!
//! let mut controller = Controller::spawn(Canvas::new(width, height))?;
//! controller.initialize(&config, SurfaceMode::Worker)?;
//!
//! // User clicked somewhere on the element.
//! controller.toggle_cell(12.0, 40.0)?;
//!
//! for update in controller.poll() {
//!     println!("fps: {}", update.fps);
//! }
//! controller.shutdown()?;
//! # Ok::<(), life_worker::runtime::ControlError>(())
//! ```

pub mod compute;
pub mod runtime;
pub mod schema;

// WebAssembly bindings (only for wasm32 target)
#[cfg(target_arch = "wasm32")]
pub mod wasm;

// Re-export commonly used types
pub use compute::{Automaton, Cell, Universe};
pub use runtime::{Canvas, Controller, SessionStatus, SurfaceMode};
pub use schema::{Color, Seed, SessionConfig};
