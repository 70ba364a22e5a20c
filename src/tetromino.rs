//! Tetromino definitions and shapes
//!
//! All 7 tetrominoes with their rotation states. Each state is a small
//! occupancy grid anchored at the top-left corner of its bounding box;
//! `1` marks an occupied cell. Rotating past the last state wraps to the first.

use crate::error::{Error, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// One orientation of a tetromino: rows of occupancy flags
pub type Shape = &'static [&'static [u8]];

const I_STATES: &[Shape] = &[&[&[1], &[1], &[1], &[1]], &[&[1, 1, 1, 1]]];

const J_STATES: &[Shape] = &[
    &[&[0, 1], &[0, 1], &[1, 1]],
    &[&[1, 1, 1], &[0, 0, 1]],
    &[&[1, 1], &[1, 0], &[1, 0]],
    &[&[1, 0, 0], &[1, 1, 1]],
];

const L_STATES: &[Shape] = &[
    &[&[1, 0], &[1, 0], &[1, 1]],
    &[&[0, 0, 1], &[1, 1, 1]],
    &[&[1, 1], &[0, 1], &[0, 1]],
    &[&[1, 1, 1], &[1, 0, 0]],
];

const O_STATES: &[Shape] = &[&[&[1, 1], &[1, 1]]];

const S_STATES: &[Shape] = &[&[&[0, 1, 1], &[1, 1, 0]], &[&[1, 0], &[1, 1], &[0, 1]]];

const T_STATES: &[Shape] = &[
    &[&[1, 1, 1], &[0, 1, 0]],
    &[&[1, 0], &[1, 1], &[1, 0]],
    &[&[0, 1, 0], &[1, 1, 1]],
    &[&[0, 1], &[1, 1], &[0, 1]],
];

const Z_STATES: &[Shape] = &[&[&[1, 1, 0], &[0, 1, 1]], &[&[0, 1], &[1, 1], &[1, 0]]];

/// The 7 tetromino kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TetrominoKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl TetrominoKind {
    /// All kinds, in catalog order
    pub fn all() -> [TetrominoKind; 7] {
        [
            TetrominoKind::I,
            TetrominoKind::J,
            TetrominoKind::L,
            TetrominoKind::O,
            TetrominoKind::S,
            TetrominoKind::T,
            TetrominoKind::Z,
        ]
    }

    /// Rotation states in cyclic order
    pub fn states(&self) -> &'static [Shape] {
        match self {
            TetrominoKind::I => I_STATES,
            TetrominoKind::J => J_STATES,
            TetrominoKind::L => L_STATES,
            TetrominoKind::O => O_STATES,
            TetrominoKind::S => S_STATES,
            TetrominoKind::T => T_STATES,
            TetrominoKind::Z => Z_STATES,
        }
    }

    pub fn state_count(&self) -> usize {
        self.states().len()
    }

    /// The shape for a state index, `None` if the kind has no such state
    pub fn shape(&self, state: usize) -> Option<Shape> {
        self.states().get(state).copied()
    }

    /// The state that follows `state`, wrapping past the last one
    pub fn next_state(&self, state: usize) -> usize {
        (state + 1) % self.state_count()
    }

    /// Gradient colors (top, bottom) used when drawing cells of this kind
    pub fn colors(&self) -> (Color, Color) {
        match self {
            TetrominoKind::I => (Color::Rgb(255, 190, 93), Color::Rgb(255, 171, 89)),
            TetrominoKind::J => (Color::Rgb(47, 255, 150), Color::Rgb(0, 198, 98)),
            TetrominoKind::L => (Color::Rgb(0, 178, 255), Color::Rgb(0, 167, 255)),
            TetrominoKind::O => (Color::Rgb(255, 125, 173), Color::Rgb(255, 79, 143)),
            TetrominoKind::S => (Color::Rgb(255, 117, 111), Color::Rgb(246, 86, 79)),
            TetrominoKind::T => (Color::Rgb(168, 124, 255), Color::Rgb(134, 86, 229)),
            TetrominoKind::Z => (Color::Rgb(255, 242, 136), Color::Rgb(255, 233, 78)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TetrominoKind::I => "I",
            TetrominoKind::J => "J",
            TetrominoKind::L => "L",
            TetrominoKind::O => "O",
            TetrominoKind::S => "S",
            TetrominoKind::T => "T",
            TetrominoKind::Z => "Z",
        }
    }
}

/// Occupied (row, col) offsets of a shape, top-left anchored
pub fn shape_cells(shape: Shape) -> impl Iterator<Item = (i32, i32)> {
    shape.iter().enumerate().flat_map(|(i, row)| {
        row.iter()
            .enumerate()
            .filter(|&(_, &flag)| flag != 0)
            .map(move |(j, _)| (i as i32, j as i32))
    })
}

/// Check the catalog: every kind has at least one state, and every state is
/// a rectangular grid of 1..=4 rows and columns holding exactly four cells.
pub fn validate_catalog() -> Result<()> {
    for kind in TetrominoKind::all() {
        let states = kind.states();
        if states.is_empty() {
            return Err(Error::InvalidCatalog(format!("{} has no states", kind.name())));
        }
        for (idx, shape) in states.iter().enumerate() {
            let rows = shape.len();
            let cols = shape.first().map_or(0, |row| row.len());
            if !(1..=4).contains(&rows) || !(1..=4).contains(&cols) {
                return Err(Error::InvalidCatalog(format!(
                    "{} state {} is {}x{}",
                    kind.name(),
                    idx,
                    rows,
                    cols
                )));
            }
            if shape.iter().any(|row| row.len() != cols) {
                return Err(Error::InvalidCatalog(format!(
                    "{} state {} is not rectangular",
                    kind.name(),
                    idx
                )));
            }
            let filled = shape_cells(shape).count();
            if filled != 4 {
                return Err(Error::InvalidCatalog(format!(
                    "{} state {} has {} cells",
                    kind.name(),
                    idx,
                    filled
                )));
            }
        }
    }
    Ok(())
}
