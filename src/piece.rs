//! Placeable piece logic

use crate::board::{Board, Cell};
use crate::tetromino::{Shape, TetrominoKind, shape_cells};
use serde::{Deserialize, Serialize};

/// A tetromino instance on (or about to enter) the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PieceRecord", into = "PieceRecord")]
pub struct Piece {
    /// The type of tetromino
    pub kind: TetrominoKind,
    /// Anchor (top-left of the bounding box), row 0 is the top of the board
    pub row: i32,
    pub col: i32,
    /// Index into the kind's rotation states
    state: usize,
    /// Whether this piece's footprint is currently written into a board
    placed: bool,
}

/// Stored form of a piece: `{kind, row, col, stateIndex}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PieceRecord {
    kind: TetrominoKind,
    row: i32,
    col: i32,
    state_index: usize,
}

impl TryFrom<PieceRecord> for Piece {
    type Error = String;

    fn try_from(record: PieceRecord) -> Result<Self, Self::Error> {
        if record.state_index >= record.kind.state_count() {
            return Err(format!(
                "{} has no rotation state {}",
                record.kind.name(),
                record.state_index
            ));
        }
        Ok(Piece {
            kind: record.kind,
            row: record.row,
            col: record.col,
            state: record.state_index,
            placed: false,
        })
    }
}

impl From<Piece> for PieceRecord {
    fn from(piece: Piece) -> Self {
        PieceRecord {
            kind: piece.kind,
            row: piece.row,
            col: piece.col,
            state_index: piece.state,
        }
    }
}

impl Piece {
    /// A fresh piece at the spawn point: top row, horizontally centred, first
    /// state. On narrow boards the piece shifts left until it fits.
    pub fn spawn(kind: TetrominoKind, cols: usize) -> Self {
        Self {
            kind,
            row: 0,
            col: spawn_col(kind, cols),
            state: 0,
            placed: false,
        }
    }

    pub fn state(&self) -> usize {
        self.state
    }

    pub fn shape(&self) -> Shape {
        self.kind.states()[self.state]
    }

    pub fn is_placed(&self) -> bool {
        self.placed
    }

    /// Declare that the board already holds this piece's footprint
    /// (used when rebuilding a saved game)
    pub(crate) fn mark_placed(&mut self) {
        self.placed = true;
    }

    /// Still sitting on the spawn coordinates
    pub fn at_spawn(&self, cols: usize) -> bool {
        self.row == 0 && self.col == spawn_col(self.kind, cols)
    }

    /// Absolute (row, col) positions of all occupied cells
    pub fn positions(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let (row, col) = (self.row, self.col);
        shape_cells(self.shape()).map(move |(i, j)| (row + i, col + j))
    }

    /// Whether (row, col) is part of this piece's footprint on the board
    pub fn occupies(&self, row: i32, col: i32) -> bool {
        self.placed && self.positions().any(|pos| pos == (row, col))
    }

    /// Can this piece sit at (row, col) in `state`?
    ///
    /// Every occupied cell must be inside the board and either empty or part
    /// of this piece's own current footprint.
    pub fn fits(&self, board: &Board, row: i32, col: i32, state: usize) -> bool {
        let Some(shape) = self.kind.shape(state) else {
            return false;
        };
        shape_cells(shape).all(|(i, j)| {
            let (r, c) = (row + i, col + j);
            match board.get(r, c) {
                None => false,
                Some(Cell::Empty) => true,
                Some(Cell::Filled(_)) => self.occupies(r, c),
            }
        })
    }

    /// Would the piece, in its current state, hit something at (row, col)?
    ///
    /// Only the floor and foreign cells count; this is the landing test.
    pub fn bumps(&self, board: &Board, row: i32, col: i32) -> bool {
        shape_cells(self.shape()).any(|(i, j)| {
            let (r, c) = (row + i, col + j);
            if r >= board.rows() as i32 {
                return true;
            }
            matches!(board.get(r, c), Some(Cell::Filled(_))) && !self.occupies(r, c)
        })
    }

    /// Move the piece to (row, col, state) if it fits there.
    /// On failure neither the board nor the piece changes.
    pub fn place(&mut self, board: &mut Board, row: i32, col: i32, state: usize) -> bool {
        if !self.fits(board, row, col, state) {
            return false;
        }
        self.clear(board);
        self.row = row;
        self.col = col;
        self.state = state;
        let cell = Cell::Filled(self.kind);
        for (r, c) in self.positions() {
            board.set(r, c, cell);
        }
        self.placed = true;
        true
    }

    /// Put the piece on the board where it already claims to be
    pub fn show(&mut self, board: &mut Board) -> bool {
        self.place(board, self.row, self.col, self.state)
    }

    /// Remove the piece's footprint from the board
    pub fn clear(&mut self, board: &mut Board) {
        if !self.placed {
            return;
        }
        for (r, c) in self.positions() {
            board.set(r, c, Cell::Empty);
        }
        self.placed = false;
    }

    /// Try to shift by (d_row, d_col), keeping the rotation state
    pub fn move_by(&mut self, board: &mut Board, d_row: i32, d_col: i32) -> bool {
        self.place(board, self.row + d_row, self.col + d_col, self.state)
    }

    /// Rotate to the first following state that fits, in cyclic order.
    ///
    /// No wall kicks: the anchor never moves. Fails without changes if no
    /// other state fits (always the case for single-state kinds).
    pub fn rotate(&mut self, board: &mut Board) -> bool {
        let start = self.state;
        let mut candidate = self.kind.next_state(start);
        while candidate != start {
            if self.place(board, self.row, self.col, candidate) {
                return true;
            }
            candidate = self.kind.next_state(candidate);
        }
        false
    }
}

fn spawn_col(kind: TetrominoKind, cols: usize) -> i32 {
    let width = kind.states()[0].first().map_or(0, |row| row.len());
    (cols / 2).min(cols.saturating_sub(width)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn footprint(board: &Board) -> HashSet<(i32, i32)> {
        let mut cells = HashSet::new();
        for (r, row) in board.grid().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_filled() {
                    cells.insert((r as i32, c as i32));
                }
            }
        }
        cells
    }

    #[test]
    fn test_spawn_position() {
        let piece = Piece::spawn(TetrominoKind::T, 10);
        assert_eq!((piece.row, piece.col, piece.state()), (0, 5, 0));
        assert!(piece.at_spawn(10));
        assert!(!piece.is_placed());
    }

    #[test]
    fn test_spawn_fits_narrow_board() {
        let mut board = Board::with_size(20, 4);
        for kind in TetrominoKind::all() {
            let mut piece = Piece::spawn(kind, 4);
            assert!(piece.at_spawn(4));
            assert!(piece.show(&mut board), "{} should fit a 4-wide board", kind.name());
            piece.clear(&mut board);
        }
        assert_eq!(Piece::spawn(TetrominoKind::T, 4).col, 1);
        assert_eq!(Piece::spawn(TetrominoKind::I, 4).col, 2);
        assert_eq!(Piece::spawn(TetrominoKind::Z, 10).col, 5);
    }

    #[test]
    fn test_positions() {
        let mut piece = Piece::spawn(TetrominoKind::I, 10);
        piece.row = 3;
        let positions: Vec<_> = piece.positions().collect();
        assert_eq!(positions, vec![(3, 5), (4, 5), (5, 5), (6, 5)]);
    }

    #[test]
    fn test_place_moves_footprint() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(TetrominoKind::L, board.cols());
        assert!(piece.show(&mut board));
        let old: HashSet<_> = piece.positions().collect();
        assert_eq!(footprint(&board), old);

        assert!(piece.place(&mut board, 4, 2, 1));
        let new: HashSet<_> = piece.positions().collect();
        assert_eq!(footprint(&board), new);
        assert!(old.is_disjoint(&new));
        assert_eq!(board.get(5, 2), Some(Cell::Filled(TetrominoKind::L)));
    }

    #[test]
    fn test_place_overlapping_own_footprint() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(TetrominoKind::O, board.cols());
        assert!(piece.show(&mut board));
        // Moving down by one overlaps the old footprint's bottom row
        assert!(piece.move_by(&mut board, 1, 0));
        assert_eq!(board.filled_count(), 4);
        assert_eq!(board.get(0, 5), Some(Cell::Empty));
        assert_eq!(board.get(2, 6), Some(Cell::Filled(TetrominoKind::O)));
    }

    #[test]
    fn test_place_rejects_out_of_bounds() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(TetrominoKind::I, board.cols());
        assert!(piece.show(&mut board));
        let before = board.clone();

        assert!(!piece.place(&mut board, 17, 5, 0));
        assert!(!piece.place(&mut board, 0, -1, 0));
        assert!(!piece.place(&mut board, 0, 7, 1));
        assert_eq!(board, before);
        assert_eq!((piece.row, piece.col, piece.state()), (0, 5, 0));
    }

    #[test]
    fn test_place_rejects_foreign_cells() {
        let mut board = Board::new();
        board.set(2, 4, Cell::Filled(TetrominoKind::Z));
        let mut piece = Piece::spawn(TetrominoKind::T, board.cols());
        assert!(piece.show(&mut board));
        let before = board.clone();

        assert!(!piece.move_by(&mut board, 1, -2));
        assert_eq!(board, before);
    }

    #[test]
    fn test_unplaced_piece_cannot_claim_locked_cells() {
        let mut board = Board::new();
        board.set(0, 5, Cell::Filled(TetrominoKind::J));
        let mut piece = Piece::spawn(TetrominoKind::O, board.cols());

        assert!(!piece.show(&mut board));
        assert_eq!(board.get(0, 5), Some(Cell::Filled(TetrominoKind::J)));
        assert!(piece.bumps(&board, piece.row, piece.col));
    }

    #[test]
    fn test_bumps_floor_and_stack() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(TetrominoKind::O, board.cols());
        assert!(piece.place(&mut board, 18, 0, 0));
        assert!(piece.bumps(&board, 19, 0));
        assert!(!piece.bumps(&board, 18, 0));

        board.set(10, 7, Cell::Filled(TetrominoKind::S));
        let mut other = Piece::spawn(TetrominoKind::O, board.cols());
        assert!(other.place(&mut board, 7, 6, 0));
        assert!(!other.bumps(&board, 8, 6));
        assert!(other.bumps(&board, 9, 6));
    }

    #[test]
    fn test_rotate_cycles_back() {
        for kind in TetrominoKind::all() {
            let mut board = Board::new();
            let mut piece = Piece::spawn(kind, board.cols());
            assert!(piece.place(&mut board, 8, 4, 0));
            let start = footprint(&board);

            for _ in 0..kind.state_count() {
                let rotated = piece.rotate(&mut board);
                assert_eq!(rotated, kind.state_count() > 1, "{:?}", kind);
            }
            assert_eq!(piece.state(), 0, "{:?}", kind);
            assert_eq!(footprint(&board), start, "{:?}", kind);
        }
    }

    #[test]
    fn test_rotate_skips_blocked_state() {
        let mut board = Board::new();
        let mut piece = Piece::spawn(TetrominoKind::T, board.cols());
        assert!(piece.place(&mut board, 5, 3, 0));
        // Only state 1 reaches down to (7,3)
        board.set(7, 3, Cell::Filled(TetrominoKind::I));
        assert!(piece.rotate(&mut board));
        assert_eq!(piece.state(), 2);
    }

    #[test]
    fn test_rotate_blocked_everywhere_is_noop() {
        let mut board = Board::with_size(3, 4);
        let mut piece = Piece::spawn(TetrominoKind::I, board.cols());
        assert!(piece.place(&mut board, 0, 0, 1));
        let before = board.clone();
        // The vertical state needs four rows
        assert!(!piece.rotate(&mut board));
        assert_eq!(piece.state(), 1);
        assert_eq!(board, before);
    }

    #[test]
    fn test_record_roundtrip_and_validation() {
        let mut piece = Piece::spawn(TetrominoKind::J, 10);
        piece.row = 4;
        let json = serde_json::to_value(&piece).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "J", "row": 4, "col": 5, "stateIndex": 0}));

        let bad = r#"{"kind": "O", "row": 0, "col": 5, "stateIndex": 2}"#;
        assert!(serde_json::from_str::<Piece>(bad).is_err());
    }
}
