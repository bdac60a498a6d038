//! Capability interface the runtime uses to drive an automaton.

use crate::schema::Seed;

/// A two-dimensional cellular automaton with binary cell states.
///
/// The runtime only ever constructs, steps, samples and toggles; it never
/// looks inside. All calls are synchronous and expected to be cheap relative
/// to a display frame.
pub trait Automaton {
    /// Create a `width` x `height` automaton in its default initial state.
    fn new(width: u32, height: u32) -> Self
    where
        Self: Sized;

    /// Grid width in cells.
    fn width(&self) -> u32;

    /// Grid height in cells.
    fn height(&self) -> u32;

    /// Advance one generation.
    fn tick(&mut self);

    /// Row-major cell states, one byte per cell (0 dead, 1 alive),
    /// `width * height` long.
    fn cells(&self) -> &[u8];

    /// Flip the state of a single cell. `row < height` and `col < width`.
    fn toggle_cell(&mut self, row: u32, col: u32);

    /// Create an automaton whose initial state follows `seed`.
    ///
    /// The default builds with [`Automaton::new`] and toggles every cell
    /// that differs from the pattern, so it only relies on the capability
    /// interface above.
    fn from_seed(seed: &Seed, width: u32, height: u32) -> Self
    where
        Self: Sized,
    {
        let mut automaton = Self::new(width, height);
        let target = seed.generate(width, height);

        let flips: Vec<usize> = automaton
            .cells()
            .iter()
            .zip(&target)
            .enumerate()
            .filter(|(_, (current, wanted))| current != wanted)
            .map(|(i, _)| i)
            .collect();

        for i in flips {
            let row = (i / width as usize) as u32;
            let col = (i % width as usize) as u32;
            automaton.toggle_cell(row, col);
        }

        automaton
    }
}
