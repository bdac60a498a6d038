//! Drawable surfaces and their one-shot transfer between threads.
//!
//! A [`Canvas`] lives on the control thread. It either keeps its pixels and
//! receives finished frames as [`ImageBitmap`]s, or hands its drawable to
//! the worker exactly once as an [`OffscreenSurface`]. The offscreen surface
//! is move-only, so the worker side cannot alias it; the canvas side records
//! the transfer and refuses any later drawing.

use bytemuck::{Pod, Zeroable};

use crate::schema::Color;

/// One RGBA8 pixel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Blend `src` over `self` with coverage `alpha` in [0, 1].
    #[inline]
    pub fn blend(self, src: Rgba, alpha: f32) -> Rgba {
        let alpha = alpha.clamp(0.0, 1.0);
        let mix =
            |d: u8, s: u8| (f32::from(d) + (f32::from(s) - f32::from(d)) * alpha).round() as u8;
        Rgba::new(
            mix(self.r, src.r),
            mix(self.g, src.g),
            mix(self.b, src.b),
            mix(self.a, src.a),
        )
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        Rgba::new(color.r, color.g, color.b, 0xFF)
    }
}

/// Owned RGBA8 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Pixmap {
    /// Create a transparent pixmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize and clear to transparent.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize, Rgba::TRANSPARENT);
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Pixel at (x, y), or `None` outside the pixmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[y as usize * self.width as usize + x as usize])
    }

    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    /// Blend `color` into the rectangle with coverage `alpha`, clipped to the pixmap.
    pub fn blend_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let x_end = x.saturating_add(w).min(self.width) as usize;
        let y_end = y.saturating_add(h).min(self.height) as usize;
        let stride = self.width as usize;

        for row in (y as usize)..y_end {
            let line = &mut self.pixels[row * stride..(row + 1) * stride];
            if (x as usize) >= x_end {
                break;
            }
            let span = &mut line[x as usize..x_end];
            if alpha >= 1.0 {
                span.fill(color);
            } else {
                for px in span {
                    *px = px.blend(color, alpha);
                }
            }
        }
    }

    /// Fill the rectangle with an opaque color, clipped to the pixmap.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
        self.blend_rect(x, y, w, h, color, 1.0);
    }
}

/// Surface access errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Canvas control has been transferred to the worker")]
    Transferred,
}

/// Read-only snapshot of a finished frame.
///
/// Produced on the worker by [`OffscreenSurface::transfer_to_image_bitmap`]
/// and consumed on the control thread by
/// [`Canvas::transfer_from_image_bitmap`].
#[derive(Debug, PartialEq, Eq)]
pub struct ImageBitmap {
    width: u32,
    height: u32,
    pixels: Box<[Rgba]>,
}

impl ImageBitmap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        (x < self.width && y < self.height)
            .then(|| self.pixels[y as usize * self.width as usize + x as usize])
    }
}

/// Drawable resource owned by the worker thread.
///
/// Either obtained from [`Canvas::transfer_control_to_offscreen`] (the
/// worker draws straight into the page's surface) or created by the worker
/// itself as an internal target whose frames are shipped back as bitmaps.
#[derive(Debug)]
pub struct OffscreenSurface {
    pixmap: Pixmap,
}

impl OffscreenSurface {
    /// Create a detached offscreen surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixmap: Pixmap::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Resize the backing store, clearing it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixmap.resize(width, height);
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Copy the current contents into a bitmap for another thread.
    pub fn transfer_to_image_bitmap(&self) -> ImageBitmap {
        ImageBitmap {
            width: self.pixmap.width,
            height: self.pixmap.height,
            pixels: self.pixmap.pixels.clone().into_boxed_slice(),
        }
    }
}

#[derive(Debug)]
enum CanvasControl {
    Local(Pixmap),
    Transferred,
}

/// Control-thread drawable element.
///
/// `width` and `height` are the backing-store resolution, as opposed to the
/// element's rendered (CSS) size tracked by the controller.
#[derive(Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    control: CanvasControl,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            control: CanvasControl::Local(Pixmap::new(width, height)),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether control has been handed to the worker.
    pub fn is_transferred(&self) -> bool {
        matches!(self.control, CanvasControl::Transferred)
    }

    /// Change the backing resolution, clearing the contents.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        let pixmap = self.local_mut()?;
        pixmap.resize(width, height);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Hand the drawable to the worker. Can succeed only once.
    pub fn transfer_control_to_offscreen(&mut self) -> Result<OffscreenSurface, SurfaceError> {
        match std::mem::replace(&mut self.control, CanvasControl::Transferred) {
            CanvasControl::Local(pixmap) => Ok(OffscreenSurface { pixmap }),
            CanvasControl::Transferred => Err(SurfaceError::Transferred),
        }
    }

    /// Draw into the canvas from the control thread.
    pub fn draw<R>(&mut self, f: impl FnOnce(&mut Pixmap) -> R) -> Result<R, SurfaceError> {
        self.local_mut().map(f)
    }

    /// Current contents.
    pub fn contents(&self) -> Result<&Pixmap, SurfaceError> {
        match &self.control {
            CanvasControl::Local(pixmap) => Ok(pixmap),
            CanvasControl::Transferred => Err(SurfaceError::Transferred),
        }
    }

    /// Replace the contents with a finished frame, consuming the bitmap.
    ///
    /// The backing resolution is left alone; the bitmap is displayed as-is.
    pub fn transfer_from_image_bitmap(&mut self, bitmap: ImageBitmap) -> Result<(), SurfaceError> {
        let pixmap = self.local_mut()?;
        *pixmap = Pixmap {
            width: bitmap.width,
            height: bitmap.height,
            pixels: bitmap.pixels.into_vec(),
        };
        Ok(())
    }

    fn local_mut(&mut self) -> Result<&mut Pixmap, SurfaceError> {
        match &mut self.control {
            CanvasControl::Local(pixmap) => Ok(pixmap),
            CanvasControl::Transferred => Err(SurfaceError::Transferred),
        }
    }
}
