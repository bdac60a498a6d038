//! Schema module - Configuration, colors and seeding types for Life sessions.

mod color;
mod config;
mod seed;

pub use color::*;
pub use config::*;
pub use seed::*;
