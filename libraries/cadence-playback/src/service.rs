//! Playback service - serial worker around the controller
//!
//! One named thread owns command processing. Commands from the UI, hardware
//! buttons, focus changes and engine callbacks all go through one channel and
//! are applied in arrival order. Timers are waited on by the same thread, so
//! nothing else ever mutates the controller.
//!
//! Reads from other threads lock the same mutex the worker takes once per
//! message.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::controller::PlaybackController;
use crate::engine::EngineEvent;
use crate::error::{PlaybackError, Result};
use crate::events::ControllerEvent;
use crate::modes::Modes;
use crate::types::{FocusChange, Placement, PlaybackState, RepeatMode, ShuffleMode, TrackRef};

/// Commands applied by the playback worker
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the queue and open a position (random when `None`)
    Open {
        tracks: Vec<TrackRef>,
        position: Option<usize>,
    },

    /// Insert tracks into the queue
    Enqueue {
        tracks: Vec<TrackRef>,
        placement: Placement,
    },

    /// Remove queue entries `first..=last`
    RemoveRange { first: usize, last: usize },

    /// Remove every occurrence of a track
    RemoveTrack(TrackRef),

    /// Move one queue entry
    MoveItem { from: usize, to: usize },

    /// Jump to a queue entry and play it
    SetQueuePosition(usize),

    /// Empty the queue
    ClearQueue,

    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Hardware play/pause button
    TogglePause,

    /// Stop playback
    Stop,

    /// Skip to next track
    Next,

    /// "Previous" button (restarts a track that played a while)
    Previous,

    /// Seek to position (in milliseconds)
    Seek(u64),

    /// Set shuffle mode
    SetShuffle(ShuffleMode),

    /// Set repeat mode
    SetRepeat(RepeatMode),

    /// Cycle repeat mode
    CycleRepeat,

    /// Toggle shuffle on/off
    ToggleShuffle,

    /// Notification from the playback engine
    Engine(EngineEvent),

    /// Audio focus change
    Focus(FocusChange),
}

/// Messages on the worker channel
#[derive(Debug)]
enum Message {
    Command(Command),
    Shutdown,
}

/// Cloneable handle for submitting commands
///
/// Hand one to engine and focus callbacks so their notifications queue up
/// behind user commands.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Message>,
}

impl CommandSender {
    /// Submit a command
    ///
    /// Blocks while the worker queue is full.
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Message::Command(command))
            .map_err(|_| PlaybackError::WorkerStopped)
    }
}

/// Running playback worker
pub struct PlaybackService {
    /// Command sender
    command_tx: Sender<Message>,

    /// Event receiver
    event_rx: Receiver<ControllerEvent>,

    /// Controller (shared with the worker)
    controller: Arc<Mutex<PlaybackController>>,

    /// Worker thread, `None` once joined
    worker: Option<JoinHandle<()>>,
}

impl PlaybackService {
    /// Start the worker
    ///
    /// The worker restores saved state before taking commands.
    ///
    /// # Returns
    /// * `Ok(service)` - Worker running
    /// * `Err(_)` - Thread could not be spawned
    pub fn start(controller: PlaybackController) -> Result<Self> {
        let capacity = controller.config().command_capacity;
        let (command_tx, command_rx) = bounded(capacity);
        let (event_tx, event_rx) = bounded(capacity * 4);

        let controller = Arc::new(Mutex::new(controller));
        let shared = Arc::clone(&controller);

        let worker = thread::Builder::new()
            .name("cadence-playback".to_string())
            .spawn(move || Self::run(&shared, &command_rx, &event_tx))?;

        info!("Playback worker started");
        Ok(Self {
            command_tx,
            event_rx,
            controller,
            worker: Some(worker),
        })
    }

    /// Worker loop
    fn run(
        controller: &Mutex<PlaybackController>,
        command_rx: &Receiver<Message>,
        event_tx: &Sender<ControllerEvent>,
    ) {
        {
            let mut controller = lock(controller);
            controller.restore();
            forward_events(&mut controller, event_tx);
        }

        loop {
            let deadline = lock(controller).timers().next_deadline();
            let message = match deadline {
                Some(deadline) => match command_rx.recv_deadline(deadline) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match command_rx.recv() {
                    Ok(message) => Some(message),
                    Err(_) => break,
                },
            };

            let mut controller = lock(controller);
            match message {
                Some(Message::Command(command)) => apply(&mut controller, command),
                Some(Message::Shutdown) => break,
                None => {}
            }
            controller.fire_due_timers(Instant::now());
            forward_events(&mut controller, event_tx);
        }

        let mut controller = lock(controller);
        controller.shutdown();
        forward_events(&mut controller, event_tx);
        debug!("Playback worker exiting");
    }

    // ===== Commands =====

    /// Send command to the worker
    pub fn send_command(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(Message::Command(command))
            .map_err(|_| PlaybackError::WorkerStopped)
    }

    /// Handle for callbacks that submit commands
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.command_tx.clone(),
        }
    }

    // ===== Events =====

    /// Try to receive next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ControllerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive next event, waiting up to `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ControllerEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Receiver for listeners that want to select over events
    pub fn events(&self) -> Receiver<ControllerEvent> {
        self.event_rx.clone()
    }

    // ===== Snapshots =====

    /// Run `f` against the controller under its lock
    pub fn with_controller<R>(&self, f: impl FnOnce(&PlaybackController) -> R) -> R {
        f(&*lock(&self.controller))
    }

    pub fn get_state(&self) -> PlaybackState {
        self.with_controller(PlaybackController::get_state)
    }

    pub fn get_queue(&self) -> Vec<TrackRef> {
        self.with_controller(|c| c.get_queue().to_vec())
    }

    pub fn get_queue_position(&self) -> Option<usize> {
        self.with_controller(PlaybackController::get_queue_position)
    }

    pub fn get_current_track(&self) -> Option<TrackRef> {
        self.with_controller(PlaybackController::get_current_track)
    }

    pub fn get_modes(&self) -> Modes {
        self.with_controller(PlaybackController::get_modes)
    }

    pub fn get_position(&self) -> u64 {
        self.with_controller(PlaybackController::get_position)
    }

    // ===== Teardown =====

    /// Stop the worker and wait for it
    ///
    /// The worker persists the full state and releases the engine before it
    /// exits. Calling this twice is harmless.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.command_tx.send(Message::Shutdown).is_err() {
            debug!("Playback worker already gone");
        }
        if worker.join().is_err() {
            warn!("Playback worker panicked");
        }
        info!("Playback worker stopped");
    }

    /// Whether the worker is still running
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(controller: &Mutex<PlaybackController>) -> MutexGuard<'_, PlaybackController> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(controller: &mut PlaybackController, command: Command) {
    debug!(?command, "Applying command");
    match command {
        Command::Open { tracks, position } => controller.open(&tracks, position),
        Command::Enqueue { tracks, placement } => controller.enqueue(&tracks, placement),
        Command::RemoveRange { first, last } => {
            controller.remove_range(first, last);
        }
        Command::RemoveTrack(track) => {
            controller.remove_track(track);
        }
        Command::MoveItem { from, to } => controller.move_item(from, to),
        Command::SetQueuePosition(index) => controller.set_queue_position(index),
        Command::ClearQueue => controller.clear_queue(),
        Command::Play => controller.play(),
        Command::Pause => controller.pause(),
        Command::TogglePause => controller.toggle_pause(),
        Command::Stop => controller.stop(),
        Command::Next => controller.next(),
        Command::Previous => controller.go_to_prev(),
        Command::Seek(position_ms) => {
            controller.seek(position_ms);
        }
        Command::SetShuffle(mode) => controller.set_shuffle_mode(mode),
        Command::SetRepeat(mode) => controller.set_repeat_mode(mode),
        Command::CycleRepeat => controller.cycle_repeat(),
        Command::ToggleShuffle => controller.toggle_shuffle(),
        Command::Engine(event) => controller.on_engine_event(event),
        Command::Focus(change) => controller.on_focus_change(change),
    }
}

/// Hand collected events to listeners
///
/// Listeners that fall behind lose events instead of stalling the worker.
fn forward_events(controller: &mut PlaybackController, event_tx: &Sender<ControllerEvent>) {
    for event in controller.drain_events() {
        match event_tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => debug!(?event, "Event listener lagging, dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::ControllerConfig;
    use crate::controller::Collaborators;
    use crate::engine::{AlwaysGranted, DummyEngine};
    use crate::settings::MemorySettings;

    fn service(settings: MemorySettings) -> PlaybackService {
        let controller = PlaybackController::new(
            ControllerConfig {
                rng_seed: Some(3),
                ..ControllerConfig::default()
            },
            Collaborators {
                catalog: Box::new(MemoryCatalog::synthetic(20)),
                engine: Box::new(DummyEngine::default()),
                focus: Box::new(AlwaysGranted),
                settings: Box::new(settings),
            },
        );
        PlaybackService::start(controller).unwrap()
    }

    #[test]
    fn commands_apply_in_order() {
        let mut service = service(MemorySettings::new());
        let sender = service.sender();

        sender
            .send(Command::Open {
                tracks: vec![TrackRef(1), TrackRef(2), TrackRef(3)],
                position: Some(0),
            })
            .unwrap();
        service.send_command(Command::Play).unwrap();
        service.send_command(Command::Next).unwrap();
        service.send_command(Command::Pause).unwrap();
        service.shutdown();

        assert_eq!(service.get_queue_position(), Some(1));
        assert_eq!(service.get_current_track(), Some(TrackRef(2)));
    }

    #[test]
    fn shutdown_persists_state() {
        let settings = MemorySettings::new();
        let mut service = service(settings.clone());

        service
            .send_command(Command::Open {
                tracks: vec![TrackRef(4), TrackRef(5)],
                position: Some(1),
            })
            .unwrap();
        service.send_command(Command::SetRepeat(RepeatMode::All)).unwrap();
        service.shutdown();

        let saved = settings.snapshot();
        assert_eq!(saved.queue, vec![TrackRef(4), TrackRef(5)]);
        assert_eq!(saved.cursor_position, Some(1));
        assert_eq!(saved.repeat_mode, RepeatMode::All);
        assert!(!service.is_running());
    }

    #[test]
    fn send_after_shutdown_fails() {
        let mut service = service(MemorySettings::new());
        service.shutdown();
        service.shutdown();

        assert!(matches!(
            service.send_command(Command::Play),
            Err(PlaybackError::WorkerStopped)
        ));
    }
}
