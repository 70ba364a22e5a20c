//! Game controller: commands, gravity, scoring and the game lifecycle

use crate::animation::{Animation, AnimationFrame, Animator, NoAnimation, Playback};
use crate::board::{Board, Cell, Spawn};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::generator::PieceGenerator;
use crate::persistence::{Persistence, StateKey};
use crate::piece::Piece;
use crate::render::{NullRenderer, RenderEvent, Renderer};
use crate::score::{Progress, speed_for_level};
use crate::tetromino::validate_catalog;
use crate::timer::{ManualTimer, Timer};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Down,
    /// Reserved: accepted but never moves the piece
    Up,
}

impl Direction {
    /// (row, col) offset of a one-step move
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Up => (-1, 0),
        }
    }
}

/// Commands a player (or a test harness) can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Rotate,
    /// `None` toggles, `Some(p)` requests a specific pause state
    TogglePause(Option<bool>),
    NewGame,
}

/// Lifecycle of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing started yet
    Unstarted,
    Running,
    Paused,
    /// Rows are flashing before removal; input is frozen
    Clearing,
    Finished,
}

/// Outcome of [`GameController::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restored {
    /// A saved game was rebuilt and is waiting, paused
    Resumed,
    /// Nothing saved; waiting for a new game
    Fresh,
    /// The save was unreadable, so a new game was started instead
    Recovered,
}

/// Everything that describes one game
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub board: Board,
    /// The falling piece
    pub current: Piece,
    /// The piece on deck
    pub next: Piece,
    pub progress: Progress,
    pub phase: Phase,
    /// Gravity interval
    pub speed: Duration,
}

impl GameState {
    fn fresh(settings: &Settings, generator: &mut PieceGenerator, phase: Phase) -> Self {
        let gameplay = &settings.gameplay;
        let board = Board::with_size(gameplay.rows, gameplay.cols);
        let cols = board.cols();
        Self {
            current: Piece::spawn(generator.next_kind(), cols),
            next: Piece::spawn(generator.next_kind(), cols),
            board,
            progress: Progress::new(),
            phase,
            speed: speed_for_level(0, gameplay),
        }
    }

    /// Paused by the player or frozen by a line clear
    pub fn paused(&self) -> bool {
        matches!(self.phase, Phase::Paused | Phase::Clearing)
    }

    pub fn finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn score(&self) -> u64 {
        self.progress.score
    }

    pub fn level(&self) -> u32 {
        self.progress.level
    }

    pub fn run_time_ms(&self) -> u64 {
        self.progress.run_time_ms
    }
}

/// Owns the game state and its collaborators.
///
/// Every entry point runs to completion before the next one starts; the
/// session module provides that serialization when timers are real.
pub struct GameController {
    settings: Settings,
    state: GameState,
    generator: PieceGenerator,
    persistence: Persistence,
    renderer: Box<dyn Renderer>,
    timer: Box<dyn Timer>,
    animator: Box<dyn Animator>,
    /// Rows waiting for removal while in `Phase::Clearing`
    clearing: Vec<usize>,
    record: u64,
}

impl GameController {
    /// Create a controller with inert collaborators (no drawing, manual
    /// timer, no animations); swap them with the `with_*` methods.
    pub fn new(settings: Settings, persistence: Persistence) -> Result<Self> {
        validate_catalog()?;
        let gameplay = &settings.gameplay;
        if gameplay.rows < 4 || gameplay.cols < 4 {
            return Err(Error::InvalidSettings(format!(
                "a {}x{} board cannot hold every piece",
                gameplay.rows, gameplay.cols
            )));
        }

        let mut generator = match gameplay.seed {
            Some(seed) => PieceGenerator::with_seed(gameplay.randomizer, seed),
            None => PieceGenerator::new(gameplay.randomizer),
        };
        let state = GameState::fresh(&settings, &mut generator, Phase::Unstarted);
        let record = match persistence.load::<u64>(StateKey::Record) {
            Ok(record) => record.unwrap_or(0),
            Err(e) => {
                warn!("ignoring unreadable record: {}", e);
                0
            }
        };

        Ok(Self {
            settings,
            state,
            generator,
            persistence,
            renderer: Box::new(NullRenderer),
            timer: Box::new(ManualTimer::new()),
            animator: Box::new(NoAnimation),
            clearing: Vec::new(),
            record,
        })
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Box::new(timer);
        self
    }

    pub fn with_animator(mut self, animator: impl Animator + 'static) -> Self {
        self.animator = Box::new(animator);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Best score seen so far
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Run one command; false when it was rejected or had no effect
    pub fn dispatch(&mut self, command: Command) -> bool {
        match command {
            Command::Move(direction) => self.move_piece(direction),
            Command::Rotate => self.rotate(),
            Command::TogglePause(requested) => self.toggle_pause(requested),
            Command::NewGame => self.new_game(),
        }
    }

    /// Throw away the current game and start a fresh one
    pub fn new_game(&mut self) -> bool {
        self.timer.cancel();
        self.animator.cancel();
        self.clearing.clear();

        self.state = GameState::fresh(&self.settings, &mut self.generator, Phase::Running);
        if !self.state.current.show(&mut self.state.board) {
            warn!(kind = self.state.current.kind.name(), "first piece does not fit the board");
            self.game_over();
            return false;
        }
        info!(
            current = self.state.current.kind.name(),
            next = self.state.next.kind.name(),
            "new game"
        );

        self.save_all();
        self.notify_score();
        self.notify_level();
        self.notify_preview();
        self.notify_board();
        self.renderer.notify(RenderEvent::PauseChanged(false));
        self.timer.start(self.state.speed);
        true
    }

    /// Rebuild the saved game, or fall back to a fresh one if it is corrupt
    pub fn restore(&mut self) -> Restored {
        match self.resume() {
            Ok(true) => Restored::Resumed,
            Ok(false) => Restored::Fresh,
            Err(e) => {
                warn!("saved game unusable, starting over: {}", e);
                self.new_game();
                Restored::Recovered
            }
        }
    }

    /// Rebuild the saved game. A resumed game starts paused.
    ///
    /// Returns `Ok(false)` when there is nothing to resume (no saved run
    /// time, or a run time of zero left behind by a finished game). On error
    /// the controller is left as it was.
    pub fn resume(&mut self) -> Result<bool> {
        let run_time: Option<u64> = self.persistence.load(StateKey::RunTime)?;
        let run_time = match run_time {
            Some(ms) if ms > 0 => ms,
            _ => return Ok(false),
        };

        let gameplay = &self.settings.gameplay;
        let cells: Vec<Vec<Cell>> = self.require(StateKey::Matrix)?;
        let board = Board::from_rows(cells, gameplay.rows, gameplay.cols)?;
        let mut current: Piece = self.require(StateKey::CurrentPiece)?;
        let next: Piece = self.require(StateKey::NextPiece)?;
        let score: u64 = self.persistence.load(StateKey::Score)?.unwrap_or(0);
        let level: u32 = self.persistence.load(StateKey::Level)?.unwrap_or(0);

        let on_board = current
            .positions()
            .all(|(r, c)| matches!(board.get(r, c), Some(Cell::Filled(kind)) if kind == current.kind));
        if !on_board {
            return Err(Error::corrupt(
                StateKey::CurrentPiece.as_str(),
                "piece does not match the saved matrix",
            ));
        }
        current.mark_placed();

        // The preview only has to fit the board; the stack may still cover it
        let open = Board::with_size(board.rows(), board.cols());
        if !next.fits(&open, next.row, next.col, next.state()) {
            return Err(Error::corrupt(
                StateKey::NextPiece.as_str(),
                "piece does not fit the board",
            ));
        }

        self.timer.cancel();
        self.animator.cancel();
        self.clearing.clear();
        self.state = GameState {
            board,
            current,
            next,
            progress: Progress {
                score,
                level,
                run_time_ms: run_time,
            },
            phase: Phase::Paused,
            speed: speed_for_level(level, gameplay),
        };
        info!(score, level, run_time, "resumed saved game");

        self.persistence.save_or_warn(StateKey::Pause, &true);
        self.notify_score();
        self.notify_level();
        self.notify_preview();
        self.notify_board();
        self.renderer.notify(RenderEvent::PauseChanged(true));
        self.animator.play(Animation::PauseFlash {
            piece: self.state.current.clone(),
        });
        Ok(true)
    }

    fn require<T: serde::de::DeserializeOwned>(&self, key: StateKey) -> Result<T> {
        self.persistence
            .load(key)?
            .ok_or_else(|| Error::corrupt(key.as_str(), "missing"))
    }

    /// Move the falling piece one step.
    ///
    /// A downward move that would hit the floor or the stack lands the piece
    /// instead: full rows are cleared and the next piece spawns. Landing
    /// reports `false` since the piece itself did not move.
    pub fn move_piece(&mut self, direction: Direction) -> bool {
        if self.state.phase != Phase::Running {
            return false;
        }

        match direction {
            Direction::Up => {
                debug!("upward move ignored");
                return false;
            }
            Direction::Down => {
                let piece = &self.state.current;
                if piece.bumps(&self.state.board, piece.row + 1, piece.col) {
                    self.land();
                    return false;
                }
            }
            Direction::Left | Direction::Right => {}
        }

        let (d_row, d_col) = direction.delta();
        let moved = self.state.current.move_by(&mut self.state.board, d_row, d_col);
        self.notify_board();
        self.save_current();
        moved
    }

    /// Rotate the falling piece. Allowed while paused.
    pub fn rotate(&mut self) -> bool {
        if matches!(
            self.state.phase,
            Phase::Unstarted | Phase::Clearing | Phase::Finished
        ) {
            return false;
        }

        let rotated = self.state.current.rotate(&mut self.state.board);
        if rotated && self.state.phase == Phase::Paused {
            self.animator.play(Animation::PauseFlash {
                piece: self.state.current.clone(),
            });
        }
        self.notify_board();
        self.save_current();
        rotated
    }

    /// Pause or resume. `None` flips the current state.
    ///
    /// Only switches between running and paused; a finished game, a game
    /// not yet started and a running line clear all ignore it.
    pub fn toggle_pause(&mut self, requested: Option<bool>) -> bool {
        let paused = match self.state.phase {
            Phase::Running => false,
            Phase::Paused => true,
            _ => return false,
        };
        let pause = requested.unwrap_or(!paused);
        if pause == paused {
            return false;
        }

        if pause {
            self.state.phase = Phase::Paused;
            self.timer.cancel();
            self.animator.play(Animation::PauseFlash {
                piece: self.state.current.clone(),
            });
        } else {
            self.animator.cancel();
            self.state.phase = Phase::Running;
            self.timer.start(self.state.speed);
            self.notify_board();
        }
        info!(paused = pause, "pause toggled");

        self.persistence.save_or_warn(StateKey::Pause, &pause);
        self.renderer.notify(RenderEvent::PauseChanged(pause));
        true
    }

    /// One gravity tick: move down, account run time, maybe level up
    pub fn tick(&mut self) -> bool {
        if self.state.phase != Phase::Running {
            return false;
        }

        self.move_piece(Direction::Down);
        if self.state.finished() {
            return true;
        }

        let speed = self.state.speed;
        if self.state.progress.advance(speed, &self.settings.gameplay) {
            self.state.speed = self.state.progress.speed(&self.settings.gameplay);
            info!(
                level = self.state.progress.level,
                speed_ms = self.state.speed.as_millis() as u64,
                "level up"
            );
            self.persistence
                .save_or_warn(StateKey::Level, &self.state.progress.level);
            self.notify_level();
            // A line clear in progress restarts the timer when it finishes
            if self.state.phase == Phase::Running {
                self.timer.start(self.state.speed);
            }
        }

        self.persistence
            .save_or_warn(StateKey::RunTime, &self.state.progress.run_time_ms);
        self.save_current();
        true
    }

    /// A tick from the timer; stale ticks from a replaced schedule are dropped
    pub fn on_timer(&mut self, generation: u64) -> bool {
        if !self.timer.is_current(generation) {
            debug!(generation, "stale tick dropped");
            return false;
        }
        self.tick()
    }

    /// Forward an animation frame to the renderer
    pub fn on_frame(&mut self, generation: u64, frame: AnimationFrame) {
        if self.animator.is_current(generation) {
            self.renderer.notify(RenderEvent::Frame(frame));
        }
    }

    /// An animation ran to completion
    pub fn on_animation_done(&mut self, generation: u64, animation: Animation) {
        if !self.animator.is_current(generation) {
            return;
        }
        match animation {
            Animation::LineClear { .. } => {
                self.finish_line_clear();
            }
            Animation::PauseFlash { .. } => self.notify_board(),
        }
    }

    /// Remove the flashing rows, pay out, spawn the next piece and resume
    pub fn finish_line_clear(&mut self) -> bool {
        if self.state.phase != Phase::Clearing {
            return false;
        }

        let rows = std::mem::take(&mut self.clearing);
        self.state.board.remove_rows(&rows);
        let points = self.state.progress.add_clear(rows.len());
        info!(lines = rows.len(), points, "rows cleared");
        self.persistence
            .save_or_warn(StateKey::Score, &self.state.progress.score);
        self.notify_score();

        self.state.phase = Phase::Running;
        self.spawn_next();
        if self.state.phase == Phase::Running {
            self.timer.start(self.state.speed);
        }
        true
    }

    /// Stop everything that could still post into the controller
    pub fn shutdown(&mut self) {
        self.timer.cancel();
        self.animator.cancel();
    }

    fn land(&mut self) {
        let rows = self.state.board.full_rows();
        debug!(
            kind = self.state.current.kind.name(),
            row = self.state.current.row,
            col = self.state.current.col,
            full = rows.len(),
            "piece landed"
        );
        if rows.is_empty() {
            self.spawn_next();
            return;
        }

        self.state.phase = Phase::Clearing;
        self.timer.cancel();
        self.clearing = rows.clone();
        if self.animator.play(Animation::LineClear { rows }) == Playback::Instant {
            self.finish_line_clear();
        }
    }

    fn spawn_next(&mut self) {
        let next = self.state.next.clone();
        match self.state.board.spawn_next(&self.state.current, next) {
            Spawn::Active(piece) => {
                self.state.current = piece;
                let cols = self.state.board.cols();
                self.state.next = Piece::spawn(self.generator.next_kind(), cols);
                self.save_current();
                self.persistence
                    .save_or_warn(StateKey::NextPiece, &self.state.next);
                self.notify_preview();
                self.notify_board();
            }
            Spawn::ToppedOut => self.game_over(),
        }
    }

    fn game_over(&mut self) {
        self.state.phase = Phase::Finished;
        self.timer.cancel();
        self.animator.cancel();

        let score = self.state.progress.score;
        if score > self.record {
            self.record = score;
            self.persistence.save_or_warn(StateKey::Record, &score);
        }
        // A zero run time marks the save as finished: nothing to resume
        self.state.progress.run_time_ms = 0;
        self.persistence.save_or_warn(StateKey::RunTime, &0u64);
        info!(score, record = self.record, "game over");

        self.notify_board();
        self.renderer.notify(RenderEvent::GameOver {
            score,
            record: self.record,
        });
    }

    fn save_current(&mut self) {
        self.persistence
            .save_or_warn(StateKey::Matrix, &self.state.board);
        self.persistence
            .save_or_warn(StateKey::CurrentPiece, &self.state.current);
    }

    fn save_all(&mut self) {
        self.save_current();
        self.persistence
            .save_or_warn(StateKey::NextPiece, &self.state.next);
        self.persistence
            .save_or_warn(StateKey::Score, &self.state.progress.score);
        self.persistence
            .save_or_warn(StateKey::Level, &self.state.progress.level);
        self.persistence
            .save_or_warn(StateKey::RunTime, &self.state.progress.run_time_ms);
        self.persistence
            .save_or_warn(StateKey::Pause, &self.state.paused());
    }

    fn notify_board(&mut self) {
        self.renderer.notify(RenderEvent::BoardChanged {
            board: self.state.board.clone(),
            current: self.state.current.clone(),
        });
    }

    fn notify_preview(&mut self) {
        self.renderer
            .notify(RenderEvent::PreviewChanged(self.state.next.clone()));
    }

    fn notify_score(&mut self) {
        self.renderer
            .notify(RenderEvent::ScoreChanged(self.state.progress.score));
    }

    fn notify_level(&mut self) {
        self.renderer
            .notify(RenderEvent::LevelChanged(self.state.progress.level));
    }
}
