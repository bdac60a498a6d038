//! Reference Conway universe on a toroidal grid.

use std::fmt;

use bytemuck::NoUninit;

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;

use super::Automaton;
use crate::schema::Seed;

/// State of a single cell. The discriminant is the byte exposed by
/// [`Automaton::cells`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, NoUninit)]
pub enum Cell {
    Dead = 0,
    Alive = 1,
}

impl Cell {
    #[inline]
    pub fn toggled(self) -> Cell {
        match self {
            Cell::Dead => Cell::Alive,
            Cell::Alive => Cell::Dead,
        }
    }

    /// Next state given the number of live neighbours (B3/S23).
    #[inline]
    pub fn evolve(self, live_neighbors: u8) -> Cell {
        match (self, live_neighbors) {
            (Cell::Alive, 2) | (Cell::Alive, 3) => Cell::Alive,
            (Cell::Alive, _) => Cell::Dead,
            (Cell::Dead, 3) => Cell::Alive,
            (otherwise, _) => otherwise,
        }
    }
}

impl From<u8> for Cell {
    fn from(value: u8) -> Self {
        if value == 0 { Cell::Dead } else { Cell::Alive }
    }
}

/// Game of Life universe whose edges wrap around.
///
/// Two cell buffers are kept and swapped on every tick so stepping does not
/// allocate.
#[derive(Clone)]
pub struct Universe {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
    next: Vec<Cell>,
    generation: u64,
}

impl Universe {
    /// Create a universe populated from `seed`.
    pub fn with_seed(seed: &Seed, width: u32, height: u32) -> Self {
        let cells: Vec<Cell> = seed
            .generate(width, height)
            .into_iter()
            .map(Cell::from)
            .collect();
        let next = cells.clone();

        Self {
            width,
            height,
            cells,
            next,
            generation: 0,
        }
    }

    /// Number of ticks applied since construction.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Typed view of the cell buffer.
    pub fn get_cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Get a single cell.
    #[inline]
    pub fn get(&self, row: u32, col: u32) -> Cell {
        self.cells[self.index(row, col)]
    }

    /// Number of live cells.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Alive).count()
    }

    /// Force the given (row, col) cells alive.
    pub fn set_cells_alive(&mut self, cells: &[(u32, u32)]) {
        for &(row, col) in cells {
            let idx = self.index(row, col);
            self.cells[idx] = Cell::Alive;
        }
    }

    /// Kill every cell.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::Dead);
    }

    #[inline]
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }
}

/// Distinct wrapped offsets `0, +1, -1` along an axis of `extent` cells.
///
/// On extents below 3 the offsets coincide, so a 1-wide axis yields only
/// `0` and a 2-wide axis `0, 1`: no cell neighbours itself and no
/// neighbour is counted twice.
#[inline]
fn wrap_offsets(extent: usize) -> impl Iterator<Item = usize> {
    [0, 1, extent - 1].into_iter().take(extent.min(3))
}

/// Count live neighbours of (row, col), wrapping at the edges.
#[inline]
fn live_neighbor_count(cells: &[Cell], width: usize, height: usize, row: usize, col: usize) -> u8 {
    let mut count = 0;
    for dr in wrap_offsets(height) {
        for dc in wrap_offsets(width) {
            if dr == 0 && dc == 0 {
                continue;
            }
            let r = (row + dr) % height;
            let c = (col + dc) % width;
            count += cells[r * width + c] as u8;
        }
    }
    count
}

fn step_row(cells: &[Cell], width: usize, height: usize, row: usize, next_row: &mut [Cell]) {
    let current = &cells[row * width..(row + 1) * width];
    for (col, (next, &cell)) in next_row.iter_mut().zip(current).enumerate() {
        *next = cell.evolve(live_neighbor_count(cells, width, height, row, col));
    }
}

impl Automaton for Universe {
    fn new(width: u32, height: u32) -> Self {
        Self::with_seed(&Seed::Classic, width, height)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn tick(&mut self) {
        let width = self.width as usize;
        let height = self.height as usize;
        if width == 0 || height == 0 {
            return;
        }

        let Self { cells, next, .. } = self;
        let cells: &[Cell] = cells;

        // The default step stays on the calling thread; `parallel` hands rows
        // to rayon's global pool.
        #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
        next.par_chunks_exact_mut(width)
            .enumerate()
            .for_each(|(row, next_row)| step_row(cells, width, height, row, next_row));

        #[cfg(not(all(feature = "parallel", not(target_arch = "wasm32"))))]
        next.chunks_exact_mut(width)
            .enumerate()
            .for_each(|(row, next_row)| step_row(cells, width, height, row, next_row));

        std::mem::swap(&mut self.cells, &mut self.next);
        self.generation += 1;
    }

    fn cells(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    fn toggle_cell(&mut self, row: u32, col: u32) {
        let idx = self.index(row, col);
        self.cells[idx] = self.cells[idx].toggled();
    }

    fn from_seed(seed: &Seed, width: u32, height: u32) -> Self {
        Self::with_seed(seed, width, height)
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.cells.chunks(self.width.max(1) as usize) {
            for &cell in line {
                let symbol = if cell == Cell::Dead { '◻' } else { '◼' };
                write!(f, "{symbol}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
