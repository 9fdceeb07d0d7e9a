//! Integration tests for the playback worker
//!
//! These run the real worker thread, so waits use generous timeouts.

mod common;

use cadence_playback::{
    Collaborators, Command, ControllerConfig, ControllerEvent, EngineEvent, FocusChange,
    MemoryCatalog, MemorySettings, PlaybackController, PlaybackService, PlaybackState, TrackRef,
};
use common::{refs, test_config, MockEngine, MockFocus};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

// ===== Test Helpers =====

fn start(config: ControllerConfig) -> (PlaybackService, MockEngine, MemorySettings) {
    let engine = MockEngine::new();
    let settings = MemorySettings::new();
    let controller = PlaybackController::new(
        config,
        Collaborators {
            catalog: Box::new(MemoryCatalog::synthetic(30)),
            engine: Box::new(engine.clone()),
            focus: Box::new(MockFocus::new()),
            settings: Box::new(settings.clone()),
        },
    );
    let service = PlaybackService::start(controller).unwrap();
    (service, engine, settings)
}

/// Collect events until `done` matches one or the wait runs out
fn wait_for(
    service: &PlaybackService,
    mut done: impl FnMut(&ControllerEvent) -> bool,
) -> Vec<ControllerEvent> {
    let deadline = Instant::now() + WAIT;
    let mut events = Vec::new();
    while let Some(event) =
        service.recv_event_timeout(deadline.saturating_duration_since(Instant::now()))
    {
        events.push(event);
        if done(&event) {
            break;
        }
    }
    events
}

/// Poll until `check` holds or the wait runs out
fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}

fn open(tracks: &[u64]) -> Command {
    Command::Open {
        tracks: refs(tracks),
        position: Some(0),
    }
}

// ===== Tests =====

#[test]
fn events_arrive_in_command_order() {
    let (service, _engine, _settings) = start(test_config());

    service.send_command(open(&[1, 2, 3])).unwrap();
    service.send_command(Command::Play).unwrap();
    service.send_command(Command::Next).unwrap();

    let events = wait_for(&service, |e| {
        *e == ControllerEvent::TrackChanged {
            track: Some(TrackRef(2)),
        }
    });

    assert_eq!(
        events,
        vec![
            ControllerEvent::QueueChanged,
            ControllerEvent::TrackChanged {
                track: Some(TrackRef(1))
            },
            ControllerEvent::PlaybackStateChanged {
                state: PlaybackState::Playing
            },
            ControllerEvent::TrackChanged {
                track: Some(TrackRef(2))
            },
        ]
    );
}

#[test]
fn engine_callbacks_queue_behind_user_commands() {
    let (service, engine, _settings) = start(test_config());
    let sender = service.sender();

    service.send_command(open(&[1, 2, 3])).unwrap();
    service.send_command(Command::Play).unwrap();
    sender.send(Command::Engine(EngineEvent::EndOfTrack)).unwrap();

    wait_for(&service, |e| {
        *e == ControllerEvent::TrackChanged {
            track: Some(TrackRef(2)),
        }
    });
    assert_eq!(service.get_current_track(), Some(TrackRef(2)));
    assert_eq!(engine.log().next, Some(TrackRef(3)));
}

#[test]
fn idle_timer_releases_engine() {
    let config = ControllerConfig {
        idle_delay_ms: 50,
        ..test_config()
    };
    let (service, engine, settings) = start(config);

    service.send_command(open(&[1, 2])).unwrap();
    service.send_command(Command::Play).unwrap();
    service.send_command(Command::Pause).unwrap();

    let events = wait_for(&service, |e| {
        *e == ControllerEvent::PlaybackStateChanged {
            state: PlaybackState::Idle,
        }
    });

    assert!(events.contains(&ControllerEvent::PlaybackStateChanged {
        state: PlaybackState::Idle
    }));
    assert!(eventually(|| engine.log().current.is_none()));
    assert_eq!(settings.snapshot().queue, refs(&[1, 2]));
}

#[test]
fn focus_gain_fades_back_in() {
    let config = ControllerConfig {
        fade_step_ms: 1,
        fade_in_step: 0.1,
        ..test_config()
    };
    let (service, engine, _settings) = start(config);
    let sender = service.sender();

    service.send_command(open(&[1, 2])).unwrap();
    service.send_command(Command::Play).unwrap();
    sender
        .send(Command::Focus(FocusChange::LossTransient))
        .unwrap();

    wait_for(&service, |e| {
        *e == ControllerEvent::PlaybackStateChanged {
            state: PlaybackState::PausedByFocusLoss,
        }
    });

    sender.send(Command::Focus(FocusChange::Gain)).unwrap();

    assert!(eventually(|| service.get_state() == PlaybackState::Playing));
    assert!(eventually(|| (engine.log().volume - 1.0).abs() < 1e-6));
    assert!(engine.log().playing);
}

#[test]
fn shutdown_saves_position() {
    let (mut service, engine, settings) = start(test_config());

    service.send_command(open(&[5, 6, 7])).unwrap();
    service.send_command(Command::SetQueuePosition(1)).unwrap();
    service.send_command(Command::Seek(12_000)).unwrap();
    service.shutdown();

    let saved = settings.snapshot();
    assert_eq!(saved.queue, refs(&[5, 6, 7]));
    assert_eq!(saved.cursor_position, Some(1));
    assert_eq!(saved.seek_position_ms, 12_000);
    assert!(engine.log().current.is_none());
    assert!(!service.is_running());
}
