//! Simulated playback engine
//!
//! Tracks a wall-clock position for the current source instead of decoding
//! audio, and reports the end of each track like a real output would. Tracks
//! missing from the library fail to open.

use cadence_playback::{
    Command, CommandSender, EngineEvent, MemoryCatalog, PlaybackEngine, TrackCatalog, TrackRef,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct SimState {
    durations: HashMap<TrackRef, u64>,
    current: Option<TrackRef>,
    next: Option<TrackRef>,

    /// Position when output last started or paused
    offset_ms: u64,

    /// Set while output is running
    started: Option<Instant>,

    /// End of the current source already reported
    ended: bool,

    volume: f32,
}

impl SimState {
    fn duration_ms(&self) -> u64 {
        self.current
            .and_then(|track| self.durations.get(&track).copied())
            .unwrap_or(0)
    }

    fn position_ms(&self) -> u64 {
        let running = self
            .started
            .map_or(0, |started| started.elapsed().as_millis() as u64);
        (self.offset_ms + running).min(self.duration_ms())
    }

    fn load(&mut self, track: Option<TrackRef>) {
        self.current = track;
        self.offset_ms = 0;
        self.ended = false;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

/// Engine that plays silence for as long as each track lasts
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedEngine {
    /// Engine knowing the durations of every track in `catalog`
    pub fn new(catalog: &MemoryCatalog) -> Self {
        let durations = catalog
            .all_tracks()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|track| {
                catalog
                    .resolve(track)
                    .ok()
                    .map(|metadata| (track, metadata.duration_ms))
            })
            .collect();

        Self {
            state: Arc::new(Mutex::new(SimState {
                durations,
                current: None,
                next: None,
                offset_ms: 0,
                started: None,
                ended: false,
                volume: 1.0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch to the prefetched source right away
    ///
    /// Returns `false` when nothing was prefetched.
    pub fn advance_to_prefetched(&self) -> bool {
        let mut state = self.lock();
        let Some(next) = state.next.take() else {
            return false;
        };
        state.load(Some(next));
        true
    }

    /// Check whether the current source ran out
    ///
    /// Moves on to the prefetched source when there is one.
    pub fn tick(&self) -> Option<EngineEvent> {
        let mut state = self.lock();
        if state.started.is_none() || state.ended || state.current.is_none() {
            return None;
        }
        if state.position_ms() < state.duration_ms() {
            return None;
        }

        match state.next.take() {
            Some(next) => {
                state.load(Some(next));
                Some(EngineEvent::AdvancedToPrefetched)
            }
            None => {
                state.ended = true;
                state.offset_ms = state.duration_ms();
                state.started = None;
                Some(EngineEvent::EndOfTrack)
            }
        }
    }

    /// Current output volume
    pub fn volume(&self) -> f32 {
        self.lock().volume
    }
}

impl PlaybackEngine for SimulatedEngine {
    fn set_current_source(&mut self, track: TrackRef) -> bool {
        let mut state = self.lock();
        if !state.durations.contains_key(&track) {
            debug!(%track, "Track not in library");
            state.load(None);
            return false;
        }
        state.load(Some(track));
        true
    }

    fn set_next_source(&mut self, track: Option<TrackRef>) {
        self.lock().next = track;
    }

    fn start(&mut self) {
        let mut state = self.lock();
        if state.started.is_none() {
            state.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.offset_ms = state.position_ms();
        state.started = None;
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.current = None;
        state.next = None;
        state.offset_ms = 0;
        state.started = None;
        state.ended = false;
    }

    fn seek(&mut self, position_ms: u64) -> u64 {
        let mut state = self.lock();
        let reached = position_ms.min(state.duration_ms());
        state.offset_ms = reached;
        state.ended = false;
        if state.started.is_some() {
            state.started = Some(Instant::now());
        }
        reached
    }

    fn position_ms(&self) -> u64 {
        self.lock().position_ms()
    }

    fn duration_ms(&self) -> u64 {
        self.lock().duration_ms()
    }

    fn is_initialized(&self) -> bool {
        self.lock().current.is_some()
    }

    fn set_volume(&mut self, volume: f32) {
        self.lock().volume = volume;
    }
}

// ===== Ticker =====

/// Thread feeding end-of-track notifications into the worker queue
pub struct Ticker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Start polling `engine`
    pub fn spawn(engine: SimulatedEngine, sender: CommandSender) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("cadence-ticker".to_string())
            .spawn(move || {
                while flag.load(Ordering::Relaxed) {
                    thread::sleep(TICK);
                    if let Some(event) = engine.tick() {
                        if sender.send(Command::Engine(event)).is_err() {
                            warn!("Playback worker gone, ticker exiting");
                            break;
                        }
                    }
                }
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop polling and wait for the thread
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
