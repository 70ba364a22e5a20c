//! Renderer notifications
//!
//! The core never draws. After every state change it hands the renderer a
//! snapshot of what changed and leaves the rest to it.

use crate::animation::AnimationFrame;
use crate::board::Board;
use crate::piece::Piece;
use std::sync::{Arc, Mutex, MutexGuard};

/// Something the renderer may want to redraw
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// The matrix or the falling piece changed
    BoardChanged { board: Board, current: Piece },
    /// A new preview piece is on deck
    PreviewChanged(Piece),
    ScoreChanged(u64),
    LevelChanged(u32),
    PauseChanged(bool),
    /// The game ended; `record` is the best score after this game
    GameOver { score: u64, record: u64 },
    /// One frame of a cosmetic animation
    Frame(AnimationFrame),
}

/// Receiver of render notifications
pub trait Renderer: Send {
    fn notify(&mut self, event: RenderEvent);
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn notify(&mut self, _event: RenderEvent) {}
}

/// Keeps every notification; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, Vec<RenderEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<RenderEvent> {
        self.log().clone()
    }

    /// Take and clear everything recorded so far
    pub fn drain(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.log())
    }

    pub fn last_board(&self) -> Option<Board> {
        self.log().iter().rev().find_map(|event| match event {
            RenderEvent::BoardChanged { board, .. } => Some(board.clone()),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn notify(&mut self, event: RenderEvent) {
        self.log().push(event);
    }
}
