//! Messages exchanged between the control thread and the worker.

use std::fmt;

use super::surface::{ImageBitmap, OffscreenSurface};
use crate::schema::{Color, Seed, SessionConfig, TICK_INTERVAL_30HZ};

/// Closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Init,
    Render,
    Toggle,
    Pause,
}

impl MessageKind {
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Init,
        MessageKind::Render,
        MessageKind::Toggle,
        MessageKind::Pause,
    ];

    /// Tag used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Init => "init",
            MessageKind::Render => "render",
            MessageKind::Toggle => "toggle",
            MessageKind::Pause => "pause",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol message; the payload type is fixed by the variant.
#[derive(Debug)]
pub enum Message {
    /// Control → worker, exactly once and first.
    Init(InitPayload),
    /// Worker → control, once per rendered frame.
    Render(RenderPayload),
    /// Control → worker.
    Toggle(TogglePayload),
    /// Control → worker; `true` suspends stepping, `false` resumes.
    Pause(bool),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Init(_) => MessageKind::Init,
            Message::Render(_) => MessageKind::Render,
            Message::Toggle(_) => MessageKind::Toggle,
            Message::Pause(_) => MessageKind::Pause,
        }
    }
}

/// Session start parameters. Optional fields fall back to the defaults of
/// [`SessionConfig`].
#[derive(Debug)]
pub struct InitPayload {
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
    pub dead_color: Option<Color>,
    pub alive_color: Option<Color>,
    pub tick_interval_ms: Option<f64>,
    pub seed: Option<Seed>,
    /// Present when the control thread hands its drawable to the worker.
    pub surface: Option<OffscreenSurface>,
}

impl InitPayload {
    /// Build a payload carrying every field of `config`.
    pub fn from_config(config: &SessionConfig, surface: Option<OffscreenSurface>) -> Self {
        Self {
            width: config.width,
            height: config.height,
            cell_size: config.cell_size,
            dead_color: Some(config.dead_color),
            alive_color: Some(config.alive_color),
            tick_interval_ms: Some(config.tick_interval_ms),
            seed: Some(config.seed.clone()),
            surface,
        }
    }

    /// Resolve defaults, separating the configuration from the transferred surface.
    pub fn into_parts(self) -> (SessionConfig, Option<OffscreenSurface>) {
        let config = SessionConfig {
            width: self.width,
            height: self.height,
            cell_size: self.cell_size,
            dead_color: self.dead_color.unwrap_or(Color::WHITE),
            alive_color: self.alive_color.unwrap_or(Color::BLACK),
            tick_interval_ms: self.tick_interval_ms.unwrap_or(TICK_INTERVAL_30HZ),
            seed: self.seed.unwrap_or_default(),
        };
        (config, self.surface)
    }
}

/// Grid coordinates of a cell to flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TogglePayload {
    pub row: u32,
    pub col: u32,
}

/// Per-frame report from the worker. The variant is fixed for a session by
/// who owns the drawable.
#[derive(Debug)]
pub enum RenderPayload {
    /// The worker draws into the transferred surface; only the frame rate
    /// comes back.
    Fps(u32),
    /// The control thread owns the canvas and commits `bitmap` to it.
    Frame { fps: u32, bitmap: ImageBitmap },
}

impl RenderPayload {
    pub fn fps(&self) -> u32 {
        match self {
            RenderPayload::Fps(fps) | RenderPayload::Frame { fps, .. } => *fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_roundtrip() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_tag("resize"), None);
        assert_eq!(MessageKind::from_tag("Init"), None);
    }

    #[test]
    fn test_init_defaults() {
        let payload = InitPayload {
            width: 3,
            height: 2,
            cell_size: 1,
            dead_color: None,
            alive_color: Some(Color::rgb(1, 2, 3)),
            tick_interval_ms: None,
            seed: None,
            surface: None,
        };
        let (config, surface) = payload.into_parts();
        assert!(surface.is_none());
        assert_eq!(config.dead_color, Color::WHITE);
        assert_eq!(config.alive_color, Color::rgb(1, 2, 3));
        assert_eq!(config.seed, Seed::Classic);
        assert_eq!(config.tick_interval_ms, TICK_INTERVAL_30HZ);
    }

    #[test]
    fn test_from_config_keeps_everything() {
        let config = SessionConfig {
            width: 9,
            seed: Seed::Empty,
            ..Default::default()
        };
        let (back, _) = InitPayload::from_config(&config, None).into_parts();
        assert_eq!(back, config);
    }
}
