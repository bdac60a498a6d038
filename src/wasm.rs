//! WebAssembly bindings for Life Worker.
//!
//! Exposes the reference universe and the pointer mapper to a browser host,
//! which runs its own worker and message loop around them.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::{
    compute::{Automaton, Universe},
    runtime::{BackingSize, ElementRect, GridGeometry, PointerPosition, map_pointer},
    schema::{Seed, SessionConfig},
};

/// Initialize WASM module with panic hook and logging.
#[wasm_bindgen(start)]
pub fn init() {
    // Set panic hook for better error messages in browser
    console_error_panic_hook::set_once();

    wasm_logger::init(wasm_logger::Config::default());
}

/// WebAssembly wrapper for the Game of Life universe.
#[wasm_bindgen(js_name = Universe)]
pub struct WasmUniverse {
    universe: Universe,
}

#[wasm_bindgen(js_class = Universe)]
impl WasmUniverse {
    /// Create a universe with the classic initial pattern.
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> WasmUniverse {
        WasmUniverse {
            universe: <Universe as Automaton>::new(width, height),
        }
    }

    /// Create a universe from a JSON seed pattern.
    #[wasm_bindgen(js_name = fromSeed)]
    pub fn from_seed(seed_json: &str, width: u32, height: u32) -> Result<WasmUniverse, JsValue> {
        let seed: Seed = serde_json::from_str(seed_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid seed JSON: {e}")))?;
        seed.validate(width, height)
            .map_err(|e| JsValue::from_str(&format!("Invalid seed: {e}")))?;

        Ok(WasmUniverse {
            universe: Universe::from_seed(&seed, width, height),
        })
    }

    /// Advance one generation.
    #[wasm_bindgen]
    pub fn tick(&mut self) {
        self.universe.tick();
    }

    /// Copy of the cell states, one byte per cell.
    #[wasm_bindgen]
    pub fn cells(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.universe.cells())
    }

    #[wasm_bindgen(js_name = toggleCell)]
    pub fn toggle_cell(&mut self, row: u32, col: u32) {
        if row < self.universe.height() && col < self.universe.width() {
            self.universe.toggle_cell(row, col);
        } else {
            log::warn!("Ignoring out-of-range toggle ({row}, {col})");
        }
    }

    /// Text rendering of the grid.
    #[wasm_bindgen]
    pub fn render(&self) -> String {
        self.universe.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.universe.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.universe.height()
    }

    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> u64 {
        self.universe.generation()
    }

    /// Get a summary of the universe as a JS object.
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        let snapshot = StateSnapshot {
            width: self.universe.width(),
            height: self.universe.height(),
            generation: self.universe.generation(),
            live_cells: self.universe.live_count(),
        };

        serde_wasm_bindgen::to_value(&snapshot)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
    }
}

/// Map a pointer event onto the grid cell under it.
///
/// Returns `[row, col]`.
#[wasm_bindgen(js_name = mapPointer)]
#[allow(clippy::too_many_arguments)]
pub fn map_pointer_js(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
    rect_width: f64,
    rect_height: f64,
    backing_width: u32,
    backing_height: u32,
    grid_width: u32,
    grid_height: u32,
    cell_size: u32,
) -> Vec<u32> {
    let cell = map_pointer(
        PointerPosition {
            x: client_x,
            y: client_y,
        },
        ElementRect {
            left: rect_left,
            top: rect_top,
            width: rect_width,
            height: rect_height,
        },
        BackingSize {
            width: backing_width,
            height: backing_height,
        },
        GridGeometry {
            width: grid_width,
            height: grid_height,
            cell_size,
        },
    );
    vec![cell.row, cell.col]
}

/// Default session configuration as a JS object.
#[wasm_bindgen(js_name = defaultConfig)]
pub fn default_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&SessionConfig::default())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateSnapshot {
    width: u32,
    height: u32,
    generation: u64,
    live_cells: usize,
}
