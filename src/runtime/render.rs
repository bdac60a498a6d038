//! Render loop - samples the automaton once per display frame and composes
//! the grid into the drawable.

use std::time::{Duration, Instant};

use super::clock::DisplayLink;
use super::fps::FpsMeter;
use super::message::RenderPayload;
use super::surface::{OffscreenSurface, Pixmap, Rgba};
use crate::schema::SessionConfig;

/// Render engine initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Drawable for a {width}x{height} grid with cell size {cell_size} does not fit in u32")]
    SurfaceTooLarge {
        width: u32,
        height: u32,
        cell_size: u32,
    },
}

/// One visual cell element. Only `alpha` changes after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSprite {
    pub x: u32,
    pub y: u32,
    pub alpha: f32,
}

/// Fixed set of cell sprites laid out on the grid.
///
/// Exactly `width * height` sprites are created with the stage and the set
/// is never resized; per-frame work only touches their alpha.
#[derive(Debug, Clone)]
pub struct Stage {
    sprites: Vec<CellSprite>,
    cell_size: u32,
    background: Rgba,
    tint: Rgba,
}

impl Stage {
    pub fn new(config: &SessionConfig) -> Self {
        let pitch = config.cell_pitch();
        let width = config.width as usize;

        let sprites = (0..config.grid_size())
            .map(|i| {
                let row = (i / width) as u32;
                let col = (i % width) as u32;
                CellSprite {
                    x: col * pitch + 1,
                    y: row * pitch + 1,
                    alpha: 0.0,
                }
            })
            .collect();

        Self {
            sprites,
            cell_size: config.cell_size,
            background: config.dead_color.into(),
            tint: config.alive_color.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn sprites(&self) -> &[CellSprite] {
        &self.sprites
    }

    /// Copy cell states into sprite alphas.
    pub fn sync(&mut self, cells: &[u8]) {
        debug_assert_eq!(cells.len(), self.sprites.len(), "cell vector length changed");
        for (sprite, &cell) in self.sprites.iter_mut().zip(cells) {
            sprite.alpha = f32::from(cell);
        }
    }

    /// Draw the background and every visible sprite into `target`.
    pub fn compose(&self, target: &mut Pixmap) {
        target.fill(self.background);
        for sprite in &self.sprites {
            target.blend_rect(
                sprite.x,
                sprite.y,
                self.cell_size,
                self.cell_size,
                self.tint,
                sprite.alpha,
            );
        }
    }
}

/// Where finished frames go.
#[derive(Debug)]
enum RenderTarget {
    /// The page's own surface, transferred to the worker.
    Transferred(OffscreenSurface),
    /// A worker-side surface whose frames are shipped back as bitmaps.
    Internal(OffscreenSurface),
}

/// Display-synchronized driver: sample, update sprites, compose, measure.
#[derive(Debug)]
pub struct RenderLoop {
    stage: Stage,
    target: RenderTarget,
    link: DisplayLink,
    meter: FpsMeter,
}

impl RenderLoop {
    /// Build the stage and size the drawable for `config`.
    ///
    /// With `surface` the loop draws into it in place and reports frame rate
    /// only; without, it renders into its own surface and reports frames.
    pub fn new(
        config: &SessionConfig,
        surface: Option<OffscreenSurface>,
        refresh_interval: Duration,
        now: Instant,
    ) -> Result<Self, RenderError> {
        let (width, height) = config.surface_size().ok_or(RenderError::SurfaceTooLarge {
            width: config.width,
            height: config.height,
            cell_size: config.cell_size,
        })?;

        let target = match surface {
            Some(mut surface) => {
                surface.resize(width, height);
                RenderTarget::Transferred(surface)
            }
            None => RenderTarget::Internal(OffscreenSurface::new(width, height)),
        };

        log::debug!(
            "Render loop ready: {} sprites on a {}x{} drawable ({})",
            config.grid_size(),
            width,
            height,
            if matches!(target, RenderTarget::Transferred(_)) {
                "transferred"
            } else {
                "internal"
            }
        );

        Ok(Self {
            stage: Stage::new(config),
            target,
            link: DisplayLink::new(refresh_interval, now),
            meter: FpsMeter::default(),
        })
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Whether the drawable was transferred from the control thread.
    pub fn owns_page_surface(&self) -> bool {
        matches!(self.target, RenderTarget::Transferred(_))
    }

    pub fn surface(&self) -> &OffscreenSurface {
        match &self.target {
            RenderTarget::Transferred(surface) | RenderTarget::Internal(surface) => surface,
        }
    }

    pub fn next_deadline(&self) -> Instant {
        self.link.next_deadline()
    }

    /// Whether the display wants a frame at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.link.poll(now)
    }

    /// Render one frame from `cells` and produce the message payload for it.
    pub fn frame(&mut self, cells: &[u8], now: Instant) -> RenderPayload {
        self.stage.sync(cells);

        let surface = match &mut self.target {
            RenderTarget::Transferred(surface) | RenderTarget::Internal(surface) => surface,
        };
        self.stage.compose(surface.pixmap_mut());

        let fps = self.meter.sample(now);
        match &self.target {
            RenderTarget::Transferred(_) => RenderPayload::Fps(fps),
            RenderTarget::Internal(surface) => RenderPayload::Frame {
                fps,
                bitmap: surface.transfer_to_image_bitmap(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Color;

    fn config(width: u32, height: u32, cell_size: u32) -> SessionConfig {
        SessionConfig {
            width,
            height,
            cell_size,
            dead_color: Color::WHITE,
            alive_color: Color::BLACK,
            ..Default::default()
        }
    }

    #[test]
    fn test_sprite_count_is_fixed() {
        for (w, h, cs) in [(1, 1, 1), (7, 3, 2), (640, 360, 2)] {
            let config = config(w, h, cs);
            let mut stage = Stage::new(&config);
            assert_eq!(stage.len(), (w * h) as usize);

            let cells = vec![1u8; (w * h) as usize];
            stage.sync(&cells);
            stage.sync(&vec![0u8; (w * h) as usize]);
            assert_eq!(stage.len(), (w * h) as usize);
        }
    }

    #[test]
    fn test_sprite_layout() {
        let stage = Stage::new(&config(4, 3, 2));
        let sprites = stage.sprites();
        assert_eq!((sprites[0].x, sprites[0].y), (1, 1));
        assert_eq!((sprites[1].x, sprites[1].y), (4, 1));
        assert_eq!((sprites[4].x, sprites[4].y), (1, 4));
        assert!(sprites.iter().all(|s| s.alpha == 0.0));
    }

    #[test]
    fn test_compose_draws_live_cells() {
        let config = config(3, 2, 2);
        let mut stage = Stage::new(&config);
        let (w, h) = config.surface_size().unwrap();
        let mut pixmap = Pixmap::new(w, h);

        // Only (row 1, col 2) alive.
        stage.sync(&[0, 0, 0, 0, 0, 1]);
        stage.compose(&mut pixmap);

        let black = Rgba::new(0, 0, 0, 255);
        let white = Rgba::new(255, 255, 255, 255);
        assert_eq!(pixmap.pixel(7, 4), Some(black));
        assert_eq!(pixmap.pixel(8, 5), Some(black));
        // Grid line and dead cell stay background.
        assert_eq!(pixmap.pixel(6, 4), Some(white));
        assert_eq!(pixmap.pixel(1, 1), Some(white));
        assert_eq!(pixmap.pixels().iter().filter(|&&p| p == black).count(), 4);
    }

    #[test]
    fn test_internal_target_ships_frames() {
        let config = config(4, 4, 1);
        let t0 = Instant::now();
        let mut render =
            RenderLoop::new(&config, None, DisplayLink::DEFAULT_INTERVAL, t0).unwrap();
        assert!(!render.owns_page_surface());

        assert!(render.poll(t0));
        match render.frame(&[1; 16], t0) {
            RenderPayload::Frame { fps, bitmap } => {
                assert_eq!(fps, 0);
                assert_eq!((bitmap.width(), bitmap.height()), (9, 9));
                assert_eq!(bitmap.pixel(1, 1), Some(Rgba::new(0, 0, 0, 255)));
            }
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_transferred_target_reports_fps_only() {
        let config = config(4, 4, 1);
        let t0 = Instant::now();
        let surface = OffscreenSurface::new(1, 1);
        let mut render = RenderLoop::new(
            &config,
            Some(surface),
            DisplayLink::DEFAULT_INTERVAL,
            t0,
        )
        .unwrap();
        assert!(render.owns_page_surface());
        assert_eq!(render.surface().width(), 9);

        render.frame(&[0; 16], t0);
        let payload = render.frame(&[0; 16], t0 + Duration::from_millis(20));
        assert!(matches!(payload, RenderPayload::Fps(50)));
    }

    #[test]
    fn test_oversized_surface_fails_init() {
        let config = config(u32::MAX, 2, 4);
        let result = RenderLoop::new(
            &config,
            None,
            DisplayLink::DEFAULT_INTERVAL,
            Instant::now(),
        );
        assert!(matches!(result, Err(RenderError::SurfaceTooLarge { .. })));
    }
}
