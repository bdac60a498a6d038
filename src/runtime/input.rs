//! Pointer-to-cell mapping.
//!
//! Pointer events arrive in the element's rendered (CSS) coordinate space,
//! while the grid is laid out in backing-store pixels. The two differ
//! whenever the element is scaled or zoomed.

use crate::schema::SessionConfig;

/// Pointer position in client (viewport) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

/// The element's rendered bounding box in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    /// A rect at the origin with the given rendered size.
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }
}

/// Backing-store resolution of the drawable, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackingSize {
    pub width: u32,
    pub height: u32,
}

/// Logical grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
}

impl From<&SessionConfig> for GridGeometry {
    fn from(config: &SessionConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            cell_size: config.cell_size,
        }
    }
}

/// A cell address, always inside the grid it was mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
}

/// Map a pointer position onto the grid cell under it.
///
/// The result is clamped into the grid: positions left of or above the
/// element give row/column 0, and positions on or past the last grid line
/// give the last row/column.
pub fn map_pointer(
    pointer: PointerPosition,
    element: ElementRect,
    backing: BackingSize,
    grid: GridGeometry,
) -> GridCell {
    let sx = scale(backing.width, element.width);
    let sy = scale(backing.height, element.height);

    let local_x = (pointer.x - element.left) * sx;
    let local_y = (pointer.y - element.top) * sy;

    let pitch = f64::from(grid.cell_size) + 1.0;

    GridCell {
        row: clamp_index(local_y / pitch, grid.height),
        col: clamp_index(local_x / pitch, grid.width),
    }
}

fn scale(backing: u32, rendered: f64) -> f64 {
    if rendered.is_finite() && rendered > 0.0 {
        f64::from(backing) / rendered
    } else {
        0.0
    }
}

fn clamp_index(position: f64, extent: u32) -> u32 {
    let last = extent.saturating_sub(1);
    if !position.is_finite() {
        return if position == f64::INFINITY { last } else { 0 };
    }
    // `as` saturates, so negative values land on 0.
    (position.floor() as u32).min(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GRID: GridGeometry = GridGeometry {
        width: 640,
        height: 360,
        cell_size: 2,
    };

    const BACKING: BackingSize = BackingSize {
        width: 1921,
        height: 1081,
    };

    fn at(x: f64, y: f64) -> PointerPosition {
        PointerPosition { x, y }
    }

    #[test]
    fn test_unscaled_mapping() {
        let element = ElementRect::sized(1921.0, 1081.0);
        assert_eq!(map_pointer(at(0.0, 0.0), element, BACKING, GRID), GridCell { row: 0, col: 0 });
        assert_eq!(map_pointer(at(2.9, 2.9), element, BACKING, GRID), GridCell { row: 0, col: 0 });
        assert_eq!(map_pointer(at(3.0, 6.0), element, BACKING, GRID), GridCell { row: 2, col: 1 });
    }

    #[test]
    fn test_scaled_element() {
        // Rendered at half size: every CSS pixel covers two backing pixels.
        let element = ElementRect {
            left: 100.0,
            top: 50.0,
            width: 960.5,
            height: 540.5,
        };
        let cell = map_pointer(at(100.0 + 3.0, 50.0 + 1.5), element, BACKING, GRID);
        assert_eq!(cell, GridCell { row: 1, col: 2 });
    }

    #[test]
    fn test_last_grid_line_clamps() {
        let element = ElementRect::sized(1921.0, 1081.0);
        let cell = map_pointer(at(1920.0, 1080.0), element, BACKING, GRID);
        assert_eq!(cell, GridCell { row: 359, col: 639 });

        let beyond = map_pointer(at(5000.0, 5000.0), element, BACKING, GRID);
        assert_eq!(beyond, GridCell { row: 359, col: 639 });
    }

    #[test]
    fn test_outside_top_left_clamps_to_origin() {
        let element = ElementRect {
            left: 10.0,
            top: 10.0,
            width: 100.0,
            height: 100.0,
        };
        let cell = map_pointer(at(-50.0, 0.0), element, BACKING, GRID);
        assert_eq!(cell, GridCell { row: 0, col: 0 });
    }

    #[test]
    fn test_degenerate_element() {
        let element = ElementRect::sized(0.0, f64::NAN);
        let cell = map_pointer(at(10.0, 10.0), element, BACKING, GRID);
        assert_eq!(cell, GridCell { row: 0, col: 0 });
    }

    proptest! {
        #[test]
        fn prop_bottom_right_pixel_is_last_cell(
            scale in 0.05f64..20.0,
            left in -500.0f64..500.0,
            top in -500.0f64..500.0,
            width in 1u32..200,
            height in 1u32..200,
            cell_size in 1u32..8,
        ) {
            let grid = GridGeometry { width, height, cell_size };
            let backing = BackingSize {
                width: (cell_size + 1) * width + 1,
                height: (cell_size + 1) * height + 1,
            };
            let element = ElementRect {
                left,
                top,
                width: f64::from(backing.width) / scale,
                height: f64::from(backing.height) / scale,
            };
            let pointer = at(left + element.width, top + element.height);

            let cell = map_pointer(pointer, element, backing, grid);
            prop_assert_eq!(cell, GridCell { row: height - 1, col: width - 1 });
        }

        #[test]
        fn prop_top_left_is_origin(
            scale in 0.05f64..20.0,
            left in -500.0f64..500.0,
            top in -500.0f64..500.0,
        ) {
            let element = ElementRect {
                left,
                top,
                width: f64::from(BACKING.width) / scale,
                height: f64::from(BACKING.height) / scale,
            };
            let cell = map_pointer(at(left, top), element, BACKING, GRID);
            prop_assert_eq!(cell, GridCell { row: 0, col: 0 });
        }

        #[test]
        fn prop_always_inside_grid(
            x in -1e6f64..1e6,
            y in -1e6f64..1e6,
            ew in 0.0f64..4000.0,
            eh in 0.0f64..4000.0,
        ) {
            let cell = map_pointer(at(x, y), ElementRect::sized(ew, eh), BACKING, GRID);
            prop_assert!(cell.row < GRID.height);
            prop_assert!(cell.col < GRID.width);
        }
    }
}
