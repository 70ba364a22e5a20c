//! Game board representation, line clears and spawning

use crate::error::{Error, Result};
use crate::piece::Piece;
use crate::tetromino::TetrominoKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default board dimensions
pub const BOARD_ROWS: usize = 20;
pub const BOARD_COLS: usize = 10;

/// A cell on the board - either empty or filled by some kind of piece.
///
/// The kind is a rendering hint only; a filled cell is filled regardless of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<TetrominoKind>", into = "Option<TetrominoKind>")]
pub enum Cell {
    #[default]
    Empty,
    Filled(TetrominoKind),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

impl From<Option<TetrominoKind>> for Cell {
    fn from(kind: Option<TetrominoKind>) -> Self {
        kind.map_or(Cell::Empty, Cell::Filled)
    }
}

impl From<Cell> for Option<TetrominoKind> {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => None,
            Cell::Filled(kind) => Some(kind),
        }
    }
}

/// Result of promoting the preview piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spawn {
    /// The promoted piece is on the board and in play
    Active(Piece),
    /// No room left: the game is over
    ToppedOut,
}

/// The game board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Cell>>", into = "Vec<Vec<Cell>>")]
pub struct Board {
    /// Grid stored as [row][col], row 0 is the top
    cells: Vec<Vec<Cell>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<Vec<Cell>>> for Board {
    type Error = String;

    fn try_from(cells: Vec<Vec<Cell>>) -> std::result::Result<Self, Self::Error> {
        let cols = cells.first().map_or(0, |row| row.len());
        if cells.is_empty() || cols == 0 {
            return Err("board has no cells".to_string());
        }
        if cells.iter().any(|row| row.len() != cols) {
            return Err("board rows differ in length".to_string());
        }
        Ok(Self { cells })
    }
}

impl From<Board> for Vec<Vec<Cell>> {
    fn from(board: Board) -> Self {
        board.cells
    }
}

impl Board {
    /// Create a new empty board of the default size
    pub fn new() -> Self {
        Self::with_size(BOARD_ROWS, BOARD_COLS)
    }

    /// Create a new empty board; both dimensions are clamped to at least 1
    pub fn with_size(rows: usize, cols: usize) -> Self {
        Self {
            cells: vec![vec![Cell::Empty; cols.max(1)]; rows.max(1)],
        }
    }

    /// Rebuild a board from stored rows, checking it has the expected shape
    pub fn from_rows(cells: Vec<Vec<Cell>>, rows: usize, cols: usize) -> Result<Self> {
        let board = Board::try_from(cells).map_err(|reason| Error::corrupt("matrix", reason))?;
        if board.rows() != rows || board.cols() != cols {
            return Err(Error::corrupt(
                "matrix",
                format!(
                    "expected {}x{} board, found {}x{}",
                    rows,
                    cols,
                    board.rows(),
                    board.cols()
                ),
            ));
        }
        Ok(board)
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells[0].len()
    }

    /// Get the cell at a position (row, col)
    /// Returns None if out of bounds
    pub fn get(&self, row: i32, col: i32) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        self.cells
            .get(row as usize)
            .and_then(|cells| cells.get(col as usize))
            .copied()
    }

    /// Set a cell at a position
    /// Returns false if out of bounds
    pub fn set(&mut self, row: i32, col: i32, cell: Cell) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        match self
            .cells
            .get_mut(row as usize)
            .and_then(|cells| cells.get_mut(col as usize))
        {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_some()
    }

    /// Borrow the grid row by row
    pub fn grid(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    /// Indices of completely filled rows, top to bottom
    pub fn full_rows(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(Cell::is_filled))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Remove one row: every row above it shifts down by one and the top row
    /// becomes empty
    pub fn remove_row(&mut self, idx: usize) {
        if idx >= self.rows() {
            return;
        }
        for row in (1..=idx).rev() {
            let above = self.cells[row - 1].clone();
            self.cells[row] = above;
        }
        self.cells[0].fill(Cell::Empty);
    }

    /// Remove several rows, one shift per index, in ascending order.
    ///
    /// Removing row `k` only moves rows above `k`, so any larger index in the
    /// list still points at the same (full) row when its turn comes.
    pub fn remove_rows(&mut self, indices: &[usize]) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for idx in sorted {
            self.remove_row(idx);
        }
    }

    /// Check if the board is completely empty
    pub fn is_empty(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    /// Number of filled cells
    pub fn filled_count(&self) -> usize {
        self.cells
            .iter()
            .map(|row| row.iter().filter(|cell| cell.is_filled()).count())
            .sum()
    }

    /// Promote `next` to the active piece after `current` has landed.
    ///
    /// A landed piece that never left its spawn coordinates means the stack
    /// reached the top; so does a promoted piece that cannot be placed.
    pub fn spawn_next(&mut self, current: &Piece, mut next: Piece) -> Spawn {
        if current.at_spawn(self.cols()) {
            debug!(kind = current.kind.name(), "landed piece never left spawn");
            return Spawn::ToppedOut;
        }

        if !next.show(self) {
            debug!(kind = next.kind.name(), "spawned piece does not fit");
            return Spawn::ToppedOut;
        }

        debug!(kind = next.kind.name(), row = next.row, col = next.col, "spawned piece");
        Spawn::Active(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(board: &mut Board, row: i32, kind: TetrominoKind) {
        for col in 0..board.cols() as i32 {
            board.set(row, col, Cell::Filled(kind));
        }
    }

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new();
        assert!(board.is_empty());
        assert_eq!(board.rows(), 20);
        assert_eq!(board.cols(), 10);
    }

    #[test]
    fn test_set_and_get() {
        let mut board = Board::new();
        assert!(board.set(5, 5, Cell::Filled(TetrominoKind::Z)));
        assert_eq!(board.get(5, 5), Some(Cell::Filled(TetrominoKind::Z)));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut board = Board::new();
        assert_eq!(board.get(-1, 0), None);
        assert_eq!(board.get(0, -1), None);
        assert_eq!(board.get(BOARD_ROWS as i32, 0), None);
        assert_eq!(board.get(0, BOARD_COLS as i32), None);
        assert!(!board.set(0, BOARD_COLS as i32, Cell::Filled(TetrominoKind::I)));
    }

    #[test]
    fn test_full_rows_sparse() {
        let mut board = Board::new();
        fill_row(&mut board, 7, TetrominoKind::I);
        fill_row(&mut board, 5, TetrominoKind::O);
        board.set(6, 3, Cell::Filled(TetrominoKind::T));
        assert_eq!(board.full_rows(), vec![5, 7]);
    }

    #[test]
    fn test_full_rows_ignores_partial() {
        let mut board = Board::new();
        fill_row(&mut board, 19, TetrominoKind::I);
        board.set(19, 4, Cell::Empty);
        assert!(board.full_rows().is_empty());
    }

    #[test]
    fn test_remove_single_row() {
        let mut board = Board::new();
        fill_row(&mut board, 19, TetrominoKind::I);
        board.set(18, 0, Cell::Filled(TetrominoKind::S));

        let full = board.full_rows();
        board.remove_rows(&full);
        assert_eq!(board.get(19, 0), Some(Cell::Filled(TetrominoKind::S)));
        assert_eq!(board.filled_count(), 1);
        assert!(board.full_rows().is_empty());
    }

    #[test]
    fn test_remove_adjacent_rows() {
        let mut board = Board::new();
        fill_row(&mut board, 10, TetrominoKind::I);
        fill_row(&mut board, 11, TetrominoKind::I);
        // Markers above the cleared rows, one per row with a distinct column
        for row in 0..10 {
            board.set(row, row, Cell::Filled(TetrominoKind::T));
        }
        // Rows below the cleared band stay put
        board.set(12, 9, Cell::Filled(TetrominoKind::L));
        let before = board.clone();

        board.remove_rows(&[10, 11]);

        assert!(board.grid()[0].iter().all(Cell::is_empty));
        assert!(board.grid()[1].iter().all(Cell::is_empty));
        for row in 0..10 {
            assert_eq!(board.grid()[row + 2], before.grid()[row], "row {} shifted by 2", row);
        }
        assert_eq!(board.get(12, 9), Some(Cell::Filled(TetrominoKind::L)));
        assert_eq!(board.filled_count(), 11);
    }

    #[test]
    fn test_remove_sparse_rows() {
        let mut board = Board::new();
        fill_row(&mut board, 5, TetrominoKind::I);
        fill_row(&mut board, 7, TetrominoKind::I);
        board.set(4, 1, Cell::Filled(TetrominoKind::J));
        board.set(6, 2, Cell::Filled(TetrominoKind::S));
        board.set(8, 3, Cell::Filled(TetrominoKind::Z));

        board.remove_rows(&[5, 7]);

        // Row 6 sits between the cleared rows and drops by one
        assert_eq!(board.get(7, 2), Some(Cell::Filled(TetrominoKind::S)));
        // Row 4 sits above both and drops by two
        assert_eq!(board.get(6, 1), Some(Cell::Filled(TetrominoKind::J)));
        // Row 8 is below both and stays
        assert_eq!(board.get(8, 3), Some(Cell::Filled(TetrominoKind::Z)));
        assert_eq!(board.filled_count(), 3);
        assert!(board.full_rows().is_empty());
    }

    #[test]
    fn test_remove_rows_order_independent() {
        let mut a = Board::new();
        fill_row(&mut a, 3, TetrominoKind::I);
        fill_row(&mut a, 9, TetrominoKind::I);
        a.set(2, 0, Cell::Filled(TetrominoKind::O));
        let mut b = a.clone();

        a.remove_rows(&[3, 9]);
        b.remove_rows(&[9, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_matrix_json_shape() {
        let mut board = Board::with_size(2, 2);
        board.set(1, 0, Cell::Filled(TetrominoKind::T));
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(json, r#"[[null,null],["T",null]]"#);

        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, board);
    }

    #[test]
    fn test_from_rows_rejects_ragged_or_wrong_size() {
        let ragged = vec![vec![Cell::Empty; 10], vec![Cell::Empty; 9]];
        assert!(Board::from_rows(ragged, 2, 10).unwrap_err().is_corrupt_state());

        let small = vec![vec![Cell::Empty; 10]; 19];
        assert!(Board::from_rows(small, 20, 10).is_err());

        let ok = vec![vec![Cell::Empty; 10]; 20];
        assert!(Board::from_rows(ok, 20, 10).is_ok());
    }

    #[test]
    fn test_spawn_next_promotes_piece() {
        let mut board = Board::new();
        let mut current = Piece::spawn(TetrominoKind::O, board.cols());
        current.show(&mut board);
        assert!(current.move_by(&mut board, 5, 0));

        let next = Piece::spawn(TetrominoKind::T, board.cols());
        match board.spawn_next(&current, next) {
            Spawn::Active(piece) => {
                assert_eq!(piece.kind, TetrominoKind::T);
                assert!(piece.is_placed());
                assert_eq!(board.get(0, 5), Some(Cell::Filled(TetrominoKind::T)));
            }
            Spawn::ToppedOut => panic!("spawn should succeed on an open board"),
        }
    }

    #[test]
    fn test_spawn_next_detects_unmoved_piece() {
        let mut board = Board::new();
        let mut current = Piece::spawn(TetrominoKind::O, board.cols());
        current.show(&mut board);

        let next = Piece::spawn(TetrominoKind::I, board.cols());
        assert_eq!(board.spawn_next(&current, next), Spawn::ToppedOut);
    }

    #[test]
    fn test_spawn_next_detects_blocked_spawn() {
        let mut board = Board::new();
        board.set(1, 5, Cell::Filled(TetrominoKind::Z));
        // A landed piece that got away from the spawn point
        let mut current = Piece::spawn(TetrominoKind::O, board.cols());
        current.row = 10;

        let next = Piece::spawn(TetrominoKind::I, board.cols());
        assert_eq!(board.spawn_next(&current, next), Spawn::ToppedOut);
        // The blocked piece left the stack untouched
        assert_eq!(board.get(1, 5), Some(Cell::Filled(TetrominoKind::Z)));
    }

    #[test]
    fn test_spawn_next_rejects_piece_outside_board() {
        let mut board = Board::with_size(20, 4);
        let mut current = Piece::spawn(TetrominoKind::O, board.cols());
        current.row = 10;

        // A piece hanging over the right wall cannot be promoted
        let mut next = Piece::spawn(TetrominoKind::Z, board.cols());
        next.col = 2;
        assert_eq!(board.spawn_next(&current, next), Spawn::ToppedOut);
        assert!(board.is_empty());

        let next = Piece::spawn(TetrominoKind::Z, board.cols());
        assert!(matches!(board.spawn_next(&current, next), Spawn::Active(piece) if piece.is_placed()));
    }
}
