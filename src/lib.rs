//! blockfall: the core of a falling-block puzzle game
//!
//! Pieces fall one row per gravity tick onto a 20x10 board. Completed rows
//! are removed and paid out, the pace quickens every minute, and the game
//! ends when a landed piece never left its spawn point. Drawing, storage and
//! timing are pluggable collaborators.

pub mod animation;
pub mod board;
pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
pub mod input;
pub mod logging;
pub mod persistence;
pub mod piece;
pub mod render;
pub mod score;
pub mod session;
pub mod tetromino;
pub mod timer;

pub use board::{BOARD_COLS, BOARD_ROWS, Board, Cell};
pub use config::Settings;
pub use controller::{Command, Direction, GameController, GameState, Phase, Restored};
pub use error::{Error, Result};
pub use persistence::{FileStorage, MemoryStorage, Persistence, Storage};
pub use piece::Piece;
pub use render::{RenderEvent, Renderer};
pub use session::{Session, SessionHandle, spawn_session};
pub use tetromino::TetrominoKind;
