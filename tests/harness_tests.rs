//! End-to-end runs of the harness loop against the in-memory backends.

use fuzzy_device::codes::{self, EV_KEY, EV_SW};
use fuzzy_device::config::Config;
use fuzzy_device::driver::{self, Iteration, RunState};
use fuzzy_device::event::FieldUpdate;
use fuzzy_device::harness;
use fuzzy_device::recorder::{self, LogPaths, RunRecord};
use fuzzy_device::sequence::Sequence;
use fuzzy_device::stats::HarnessStats;
use fuzzy_device::HarnessError;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

use test_helpers::*;

fn run(world: &MockWorld, cfg: &Config) -> Result<HarnessStats, HarnessError> {
    let mut backend = world.backend();
    let stop = AtomicBool::new(false);
    harness::run(&mut backend, &mut StepClock::default(), cfg, &stop, |_| {})
}

#[test]
fn same_seed_gives_identical_runs() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let a = MockWorld::new();
    let b = MockWorld::new();
    let mut cfg_a = config_in(dir_a.path(), 1234);
    cfg_a.limit = Some(5);
    let mut cfg_b = config_in(dir_b.path(), 1234);
    cfg_b.limit = Some(5);

    let stats_a = run(&a, &cfg_a).unwrap();
    let stats_b = run(&b, &cfg_b).unwrap();

    assert_eq!(stats_a.iterations, 5);
    assert_eq!(stats_a.frames, stats_b.frames);
    assert_eq!(a.journal.borrow().created, b.journal.borrow().created);
    assert_eq!(a.injected(), b.injected());
}

/// Log of `--seed=1 --limit=1` against the in-memory backends.
const SEED_ONE_LOG: &str = include_str!("golden/seed1.evemu");

/// Header and run record: everything before the first event line.
fn preamble(log: &str) -> Vec<&str> {
    log.lines().take_while(|l| !l.starts_with("E:")).collect()
}

fn logged_fields(log: &str) -> Vec<FieldUpdate> {
    logged_events(log).into_iter().map(|e| e.update).collect()
}

fn read_events_log(dir: &Path, cfg: &Config, iteration: u64) -> String {
    fs::read_to_string(LogPaths::for_device(dir, &cfg.device_name(iteration)).events).unwrap()
}

fn seed_one_log() -> String {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 1);
    cfg.limit = Some(1);
    cfg.keep_logs = true;
    run(&world, &cfg).unwrap();
    fs::read_to_string(LogPaths::for_device(dir.path(), &cfg.device_name(0)).events).unwrap()
}

#[test]
fn seed_one_matches_the_recorded_log() {
    let log = seed_one_log();
    assert_eq!(preamble(&log), preamble(SEED_ONE_LOG));
    assert_eq!(logged_fields(&log), logged_fields(SEED_ONE_LOG));
    assert_eq!(
        recorder::parse_run_record(&log),
        Some(RunRecord {
            seed: 1,
            random: 3_067_199_153,
            draw: 1,
        })
    );
}

#[test]
fn seed_one_reproduces_its_log_byte_for_byte() {
    let first = seed_one_log();
    assert_eq!(first, seed_one_log());
    assert!(first.contains("# Requested capabilities: 62 bits\n"));
}

#[test]
fn different_seeds_diverge() {
    let dir = TempDir::new().unwrap();
    let a = MockWorld::new();
    let b = MockWorld::new();
    let mut cfg = config_in(dir.path(), 1);
    cfg.limit = Some(3);
    run(&a, &cfg).unwrap();
    cfg.seed = 2;
    run(&b, &cfg).unwrap();
    assert_ne!(a.journal.borrow().created, b.journal.borrow().created);
}

#[test]
fn limit_bounds_the_number_of_devices() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 99);
    cfg.limit = Some(4);
    let stats = run(&world, &cfg).unwrap();

    let j = world.journal.borrow();
    assert_eq!(stats.iterations, 4);
    assert_eq!(j.created.len(), 4);
    assert_eq!(j.destroyed.len(), 4);
    assert!(j.released.is_empty());
    assert_eq!(j.contexts_opened, 4);
    assert_eq!(j.contexts_closed, 4);
    let names: Vec<_> = j.created.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        ["fuzzydevice-000000", "fuzzydevice-000001", "fuzzydevice-000002", "fuzzydevice-000003"]
    );
}

#[test]
fn stop_flag_is_honored_between_iterations() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let cfg = config_in(dir.path(), 5);
    let mut backend = world.backend();
    let stop = AtomicBool::new(false);
    let mut started = 0;
    let stats = harness::run(&mut backend, &mut StepClock::default(), &cfg, &stop, |_| {
        started += 1;
        if started == 3 {
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    })
    .unwrap();
    // The third iteration still runs to completion.
    assert_eq!(stats.iterations, 3);
    assert!(stats.interrupted);
    assert_eq!(world.journal.borrow().destroyed.len(), 3);
}

#[test]
fn every_frame_ends_with_one_sync_marker() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 2024);
    cfg.limit = Some(6);
    let stats = run(&world, &cfg).unwrap();

    let markers = world.injected().iter().filter(|u| u.is_sync_marker()).count() as u64;
    assert_eq!(markers, stats.frames);
    assert_eq!(stats.sync_markers, stats.frames);
    assert_eq!(
        world.injected().len() as u64,
        stats.field_updates + stats.sync_markers
    );
    for i in 0..6 {
        let events = world.injected_into(i);
        assert!(events.last().map_or(true, FieldUpdate::is_sync_marker));
    }
}

#[test]
fn library_sees_every_injected_event() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 77);
    cfg.limit = Some(3);
    let stats = run(&world, &cfg).unwrap();
    assert_eq!(stats.library_events, stats.field_updates + stats.sync_markers);
}

#[test]
fn injected_values_respect_category() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 31337);
    cfg.limit = Some(10);
    run(&world, &cfg).unwrap();

    for u in world.injected() {
        if u.is_sync_marker() {
            continue;
        }
        assert!(!codes::is_excluded(u.type_, u.code), "excluded field injected: {u:?}");
        assert_ne!(u.type_, codes::EV_SYN);
        if u.type_ == EV_KEY || u.type_ == EV_SW {
            assert!(u.value == 0 || u.value == 1, "{u:?}");
        } else {
            assert!((0..50).contains(&u.value), "{u:?}");
        }
    }
}

#[test]
fn only_negotiated_fields_are_injected() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::with_options(MockOptions {
        refused_types: vec![EV_KEY],
        ..MockOptions::default()
    });
    let mut cfg = config_in(dir.path(), 8);
    cfg.limit = Some(8);
    run(&world, &cfg).unwrap();
    assert!(world.injected().iter().all(|u| u.type_ != EV_KEY));
}

#[test]
fn everything_refused_streams_nothing() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::with_options(MockOptions {
        refused_types: (1..=codes::EV_MAX).collect(),
        ..MockOptions::default()
    });
    let mut cfg = config_in(dir.path(), 3);
    cfg.limit = Some(3);
    let stats = run(&world, &cfg).unwrap();

    assert_eq!(stats.iterations, 3);
    assert_eq!(stats.frames, 0);
    assert_eq!(stats.empty_pool_iterations, 3);
    assert!(world.injected().is_empty());
    assert_eq!(world.journal.borrow().destroyed.len(), 3);
}

#[test]
fn replay_reproduces_a_recorded_iteration() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 4242);
    cfg.limit = Some(5);
    cfg.keep_logs = true;
    run(&world, &cfg).unwrap();

    let target = 3;
    let paths = LogPaths::for_device(dir.path(), &cfg.device_name(target));
    let log = fs::read_to_string(&paths.events).unwrap();
    let record = recorder::parse_run_record(&log).unwrap();
    assert_eq!(record.seed, 4242);

    let replay_dir = TempDir::new().unwrap();
    let replay_world = MockWorld::new();
    let mut replay_cfg = config_in(replay_dir.path(), record.seed);
    replay_cfg.replay = Some(record.random);
    replay_cfg.keep_logs = true;
    let stats = run(&replay_world, &replay_cfg).unwrap();

    assert_eq!(stats.iterations, 1);
    assert_eq!(replay_world.injected_into(0), world.injected_into(target as usize));
    assert_eq!(
        replay_world.journal.borrow().created[0].capabilities,
        world.journal.borrow().created[target as usize].capabilities
    );

    let replay_log = fs::read_to_string(
        LogPaths::for_device(replay_dir.path(), &replay_cfg.device_name(0)).events,
    )
    .unwrap();
    assert_eq!(recorder::parse_run_record(&replay_log), Some(record));
    assert_eq!(logged_fields(&replay_log), logged_fields(&log));
}

/// Runs five iterations and returns the world plus the run record of the
/// fourth.
fn record_of_fourth_iteration(dir: &TempDir) -> (MockWorld, RunRecord) {
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 4242);
    cfg.limit = Some(5);
    cfg.keep_logs = true;
    run(&world, &cfg).unwrap();
    let log = read_events_log(dir.path(), &cfg, 3);
    let record = recorder::parse_run_record(&log).unwrap();
    (world, record)
}

#[test]
fn replay_by_draw_index_reproduces_a_recorded_iteration() {
    let dir = TempDir::new().unwrap();
    let (world, record) = record_of_fourth_iteration(&dir);
    assert!(record.draw > 1);

    let replay_dir = TempDir::new().unwrap();
    let replay_world = MockWorld::new();
    let mut cfg = config_in(replay_dir.path(), record.seed);
    cfg.replay = Some(record.random);
    cfg.replay_draw = Some(record.draw);
    cfg.keep_logs = true;
    let stats = run(&replay_world, &cfg).unwrap();

    assert_eq!(stats.iterations, 1);
    assert_eq!(replay_world.injected_into(0), world.injected_into(3));
    let log = read_events_log(replay_dir.path(), &cfg, 0);
    assert_eq!(recorder::parse_run_record(&log), Some(record));
}

#[test]
fn replay_by_draw_index_rejects_a_different_random_number() {
    let dir = TempDir::new().unwrap();
    let (_, record) = record_of_fourth_iteration(&dir);

    let replay_dir = TempDir::new().unwrap();
    let replay_world = MockWorld::new();
    let mut cfg = config_in(replay_dir.path(), record.seed);
    cfg.replay = Some(record.random.wrapping_add(1));
    cfg.replay_draw = Some(record.draw);
    let err = run(&replay_world, &cfg).unwrap_err();

    assert!(
        matches!(err, HarnessError::ReplayMismatch { draw, found, .. }
            if draw == record.draw && found == record.random),
        "{err}"
    );
    assert!(replay_world.journal.borrow().created.is_empty());
}

#[test]
fn replay_of_first_iteration_does_not_skip() {
    let dir = TempDir::new().unwrap();
    let mut seq = Sequence::new(10);
    let first = seq.next();

    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 10);
    cfg.replay = Some(first);
    cfg.keep_logs = true;
    let stats = run(&world, &cfg).unwrap();
    assert_eq!(stats.iterations, 1);

    let log = read_events_log(dir.path(), &cfg, 0);
    assert_eq!(
        recorder::parse_run_record(&log),
        Some(RunRecord {
            seed: 10,
            random: first,
            draw: 1
        })
    );
}

#[test]
fn completed_iterations_remove_their_logs() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 11);
    cfg.limit = Some(2);
    run(&world, &cfg).unwrap();
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn keep_logs_leaves_both_files() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::new();
    let mut cfg = config_in(dir.path(), 11);
    cfg.limit = Some(2);
    cfg.keep_logs = true;
    run(&world, &cfg).unwrap();
    for i in 0..2 {
        let paths = LogPaths::for_device(dir.path(), &cfg.device_name(i));
        let events = fs::read_to_string(&paths.events).unwrap();
        assert!(events.starts_with("# EVEMU 1.3\n"));
        assert!(events.contains("# seed: 11\n"));
        let diag = fs::read_to_string(&paths.diagnostics).unwrap();
        assert!(diag.contains("opened"));
    }
}

#[test]
fn failed_injection_keeps_logs_and_releases_device() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::with_options(MockOptions {
        fail_inject_at: Some(0),
        ..MockOptions::default()
    });
    // Find a seed whose first device streams at least one event.
    let mut cfg = config_in(dir.path(), 0);
    cfg.limit = Some(1);
    let err = loop {
        match run(&world, &cfg) {
            Err(e) => break e,
            Ok(_) => cfg.seed += 1,
        }
    };
    assert!(matches!(err, HarnessError::Inject(_)), "{err}");

    let j = world.journal.borrow();
    assert_eq!(j.released.len(), 1);
    let paths = LogPaths::for_device(dir.path(), &cfg.device_name(0));
    let log = fs::read_to_string(&paths.events).unwrap();
    assert_eq!(recorder::parse_run_record(&log).map(|r| r.seed), Some(cfg.seed));
    // The failing event was logged before it was injected.
    assert!(!logged_events(&log).is_empty());
}

#[test]
fn create_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::with_options(MockOptions {
        fail_create: true,
        ..MockOptions::default()
    });
    let mut cfg = config_in(dir.path(), 1);
    cfg.limit = Some(3);
    let err = run(&world, &cfg).unwrap_err();
    assert!(matches!(err, HarnessError::CreateDevice { .. }));
    assert!(world.journal.borrow().created.is_empty());
}

#[test]
fn waits_through_timeouts_and_foreign_notifications() {
    let dir = TempDir::new().unwrap();
    let world = MockWorld::with_options(MockOptions {
        timeouts_before_add: 3,
        foreign_before_add: 2,
        ..MockOptions::default()
    });
    let cfg = config_in(dir.path(), 6);
    let mut backend = world.backend();
    let mut seq = Sequence::new(cfg.seed);
    let iteration = Iteration {
        index: 0,
        name: cfg.device_name(0),
        record: RunRecord {
            seed: cfg.seed,
            random: seq.next(),
            draw: 1,
        },
    };
    let report =
        driver::run_iteration(&mut backend, &mut seq, &mut StepClock::default(), &cfg, &iteration)
            .unwrap();

    assert_eq!(report.enumeration_timeouts, 3);
    assert_eq!(report.foreign_notifications, 2);
    // The change after the add, then the remove after teardown.
    assert_eq!(report.stale_notifications, 2);
    assert_eq!(world.pending_notifications(), 0);
    assert_eq!(
        report.states,
        [
            RunState::SamplingDevice,
            RunState::RealizingDevice,
            RunState::AwaitingEnumeration,
            RunState::Snapshotting,
            RunState::DrainingStale,
            RunState::StreamingEvents,
            RunState::TearingDown,
            RunState::Done,
        ]
    );
}
