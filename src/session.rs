//! Async game session
//!
//! A session task owns the controller. Commands, gravity ticks and animation
//! frames all arrive on one channel and are handled one at a time, so no
//! tick can overlap another tick or a command.

use crate::animation::{Animation, AnimationFrame, TokioAnimator};
use crate::config::Settings;
use crate::controller::{Command, GameController, GameState, Restored};
use crate::error::Result;
use crate::persistence::Persistence;
use crate::render::Renderer;
use crate::timer::TokioTimer;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Everything that can enter a session
#[derive(Debug)]
pub enum Input {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<bool>>,
    },
    Tick {
        generation: u64,
    },
    Frame {
        generation: u64,
        frame: AnimationFrame,
    },
    AnimationDone {
        generation: u64,
        animation: Animation,
    },
    Snapshot(oneshot::Sender<GameState>),
    Shutdown,
}

/// Cheap, cloneable way to talk to a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<Input>,
}

impl SessionHandle {
    /// Queue a command without waiting; false if the session is gone
    pub fn post(&self, command: Command) -> bool {
        self.tx
            .send(Input::Command {
                command,
                reply: None,
            })
            .is_ok()
    }

    /// Run a command and wait for its result; `None` if the session is gone
    pub async fn send(&self, command: Command) -> Option<bool> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Input::Command {
                command,
                reply: Some(reply),
            })
            .ok()?;
        rx.await.ok()
    }

    /// Copy of the current game state
    pub async fn snapshot(&self) -> Option<GameState> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Input::Snapshot(reply)).ok()?;
        rx.await.ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Input::Shutdown);
    }
}

/// A spawned session
pub struct Session {
    pub handle: SessionHandle,
    /// Resolves to the controller once the session shuts down
    pub task: JoinHandle<GameController>,
    /// How the saved game was picked up at start
    pub restored: Restored,
}

/// Build a controller wired to tokio timers and animations, pick up any
/// saved game, and run it on `handle`.
pub fn spawn_session(
    handle: &Handle,
    settings: Settings,
    persistence: Persistence,
    renderer: impl Renderer + 'static,
) -> Result<Session> {
    let (tx, rx) = mpsc::unbounded_channel();
    let timer = TokioTimer::new(handle.clone(), tx.clone());
    let animator = TokioAnimator::new(handle.clone(), tx.clone(), settings.animation.clone());

    let mut controller = GameController::new(settings, persistence)?
        .with_renderer(renderer)
        .with_timer(timer)
        .with_animator(animator);
    let restored = controller.restore();
    info!(?restored, "session started");

    let task = handle.spawn(run(controller, rx));
    Ok(Session {
        handle: SessionHandle { tx },
        task,
        restored,
    })
}

/// Serve inputs until shutdown, then hand the controller back
pub async fn run(mut controller: GameController, mut rx: UnboundedReceiver<Input>) -> GameController {
    while let Some(input) = rx.recv().await {
        match input {
            Input::Command { command, reply } => {
                let accepted = controller.dispatch(command);
                debug!(?command, accepted, "command");
                if let Some(reply) = reply {
                    let _ = reply.send(accepted);
                }
            }
            Input::Tick { generation } => {
                controller.on_timer(generation);
            }
            Input::Frame { generation, frame } => controller.on_frame(generation, frame),
            Input::AnimationDone {
                generation,
                animation,
            } => controller.on_animation_done(generation, animation),
            Input::Snapshot(reply) => {
                let _ = reply.send(controller.state().clone());
            }
            Input::Shutdown => break,
        }
    }
    controller.shutdown();
    info!("session stopped");
    controller
}
