//! Cosmetic animations: the line-clear flash and the paused-piece pulse
//!
//! Animations never touch game state. They produce frames for the renderer
//! and, once finished, let the controller resume (a line clear freezes play
//! until its flash completes).

use crate::config::AnimationSettings;
use crate::piece::Piece;
use crate::session::Input;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What is being animated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Animation {
    /// Flash the given rows before they are removed
    LineClear { rows: Vec<usize> },
    /// Pulse the falling piece while the game is paused
    PauseFlash { piece: Piece },
}

/// One step of an animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub animation: Animation,
    pub index: u32,
}

impl AnimationFrame {
    /// Opacity for this frame, cycling 0.0, 0.1, ... 0.9
    pub fn alpha(&self) -> f32 {
        ((self.index * 10) % 100) as f32 / 100.0
    }
}

/// How a requested animation plays out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Nothing to wait for; the animation is already over
    Instant,
    /// Frames follow asynchronously and completion is reported later
    Deferred,
}

/// Plays animations on behalf of the controller
pub trait Animator: Send {
    fn play(&mut self, animation: Animation) -> Playback;
    /// Stop the running animation; no further frames or completion follow
    fn cancel(&mut self);
    /// Whether a message stamped with `generation` belongs to the running animation
    fn is_current(&self, _generation: u64) -> bool {
        true
    }
}

/// Skips every animation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnimation;

impl Animator for NoAnimation {
    fn play(&mut self, _animation: Animation) -> Playback {
        Playback::Instant
    }

    fn cancel(&mut self) {}
}

/// Runs animations as tokio tasks posting into the session channel.
///
/// Each frame first checks a cancellation flag, so a cancelled animation
/// stops before drawing anything further.
pub struct TokioAnimator {
    handle: Handle,
    tx: UnboundedSender<Input>,
    settings: AnimationSettings,
    generation: u64,
    running: Option<Running>,
}

struct Running {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TokioAnimator {
    pub fn new(handle: Handle, tx: UnboundedSender<Input>, settings: AnimationSettings) -> Self {
        Self {
            handle,
            tx,
            settings,
            generation: 0,
            running: None,
        }
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.stop.send(true);
            running.task.abort();
        }
        self.generation += 1;
    }
}

impl Animator for TokioAnimator {
    fn play(&mut self, animation: Animation) -> Playback {
        self.stop();
        if !self.settings.enabled {
            return Playback::Instant;
        }

        let generation = self.generation;
        let (stop_tx, stop_rx) = watch::channel(false);
        let tx = self.tx.clone();
        let (frames, frame_time) = match &animation {
            Animation::LineClear { .. } => (Some(self.settings.clear_frames), self.settings.clear_frame()),
            Animation::PauseFlash { .. } => (None, self.settings.pause_frame()),
        };
        debug!(generation, ?frames, "animation started");

        let task = self.handle.spawn(async move {
            let mut index = 0;
            loop {
                if *stop_rx.borrow() || frames.is_some_and(|max| index >= max) {
                    break;
                }
                let frame = AnimationFrame {
                    animation: animation.clone(),
                    index,
                };
                if tx.send(Input::Frame { generation, frame }).is_err() {
                    return;
                }
                tokio::time::sleep(frame_time).await;
                index += 1;
            }
            let _ = tx.send(Input::AnimationDone {
                generation,
                animation,
            });
        });

        self.running = Some(Running { stop: stop_tx, task });
        Playback::Deferred
    }

    fn cancel(&mut self) {
        self.stop();
    }

    fn is_current(&self, generation: u64) -> bool {
        self.running.is_some() && generation == self.generation
    }
}

impl Drop for TokioAnimator {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}
