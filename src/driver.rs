//! One fuzzing iteration: sample a device, realize it, wait for it to show
//! up, record what the kernel accepted, stream random frames into it while
//! the library under test consumes them, then tear everything down.

use crate::backend::{
    Backend, CapabilityReader, HotplugMonitor, InputLibrary, LibraryContext, LiveDevice,
    VirtualDeviceDriver,
};
use crate::config::Config;
use crate::error::HarnessError;
use crate::event::{Clock, FieldUpdate};
use crate::recorder::{RunLogs, RunRecord};
use crate::sampler::{sample_device, FieldPool, StreamSampler};
use crate::sequence::Sequence;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Phases of one iteration, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    SamplingDevice,
    RealizingDevice,
    AwaitingEnumeration,
    Snapshotting,
    DrainingStale,
    StreamingEvents,
    TearingDown,
    Done,
}

/// Identity of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iteration {
    pub index: u64,
    pub name: String,
    pub record: RunRecord,
}

/// What one iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub name: String,
    /// Every phase entered, in order.
    pub states: Vec<RunState>,
    pub requested_bits: u32,
    pub requested_codes: usize,
    pub negotiated_codes: usize,
    pub pool_size: usize,
    pub frames: u64,
    pub field_updates: u64,
    pub sync_markers: u64,
    pub library_events: u64,
    /// Notifications that arrived while waiting but were not ours.
    pub foreign_notifications: u64,
    /// Notifications discarded before streaming and after teardown.
    pub stale_notifications: u64,
    pub enumeration_timeouts: u64,
}

impl IterationReport {
    fn enter(&mut self, state: RunState) {
        debug!(name = %self.name, ?state, "entering state");
        self.states.push(state);
    }
}

/// Runs a single iteration against `backend`, drawing from `seq`.
///
/// Any error is fatal for the whole harness. The device, if it was created,
/// is released when its handle drops; the logs of a failed iteration are
/// left on disk.
pub fn run_iteration<D, M, R, L, C>(
    backend: &mut Backend<D, M, R, L>,
    seq: &mut Sequence,
    clock: &mut C,
    config: &Config,
    iteration: &Iteration,
) -> Result<IterationReport, HarnessError>
where
    D: VirtualDeviceDriver,
    M: HotplugMonitor,
    R: CapabilityReader,
    L: InputLibrary,
    C: Clock,
{
    let started = Instant::now();
    let mut report = IterationReport {
        name: iteration.name.clone(),
        ..IterationReport::default()
    };

    report.enter(RunState::SamplingDevice);
    let mut logs = RunLogs::create(&config.log_dir, &iteration.name)?;
    let description = sample_device(seq, &iteration.name);
    report.requested_bits = description.requested_bits;
    report.requested_codes = description.capabilities.len();

    report.enter(RunState::RealizingDevice);
    let mut device = backend
        .driver
        .create(&description)
        .map_err(|source| HarnessError::CreateDevice {
            name: iteration.name.clone(),
            source,
        })?;
    let devnode = device.devnode().to_path_buf();

    report.enter(RunState::AwaitingEnumeration);
    await_enumeration(&mut backend.monitor, &devnode, config, &mut report)?;

    report.enter(RunState::Snapshotting);
    let snapshot = backend
        .reader
        .extract(&devnode)
        .map_err(|source| HarnessError::Extract {
            node: devnode.clone(),
            source,
        })?;
    report.negotiated_codes = snapshot.capabilities.len();
    logs.events
        .write_header(&description, &snapshot)
        .and_then(|()| logs.events.write_run_record(&iteration.record))
        .map_err(|e| logs.event_error(e))?;
    debug!(
        name = %iteration.name,
        requested = report.requested_codes,
        negotiated = report.negotiated_codes,
        "device snapshot recorded"
    );

    report.enter(RunState::DrainingStale);
    report.stale_notifications += drain(&mut backend.monitor)?;
    let sink = match logs.take_diagnostics() {
        Some(sink) => sink,
        None => Box::new(std::io::sink()),
    };
    let mut context = backend
        .library
        .create_context(&devnode, sink)
        .map_err(|source| HarnessError::LibraryContext {
            node: devnode.clone(),
            source,
        })?;
    report.library_events += dispatch(&mut context)?;

    report.enter(RunState::StreamingEvents);
    let pool = FieldPool::from_capabilities(&snapshot.capabilities);
    report.pool_size = pool.len();
    if pool.is_empty() {
        info!(name = %iteration.name, "no usable fields, skipping event stream");
    }
    let start = clock.now();
    let mut sampler = StreamSampler::new(seq, &pool, start);
    debug!(
        name = %iteration.name,
        frames = sampler.frame_count(),
        pool = pool.len(),
        "streaming"
    );
    while let Some(frame) = sampler.next_frame(clock.now()) {
        for update in frame.fields() {
            trace!(type_ = update.type_, code = update.code, value = update.value, "inject");
            logs.events
                .write_update(frame.timestamp, update)
                .map_err(|e| logs.event_error(e))?;
            device
                .write_event(update.type_, update.code, update.value)
                .map_err(HarnessError::Inject)?;
            report.field_updates += 1;
        }
        logs.events
            .write_sync(frame.timestamp, frame.delta_us)
            .map_err(|e| logs.event_error(e))?;
        let marker = FieldUpdate::SYN_REPORT;
        device
            .write_event(marker.type_, marker.code, marker.value)
            .map_err(HarnessError::Inject)?;
        report.sync_markers += 1;
        report.frames += 1;

        report.library_events += dispatch(&mut context)?;
    }

    report.enter(RunState::TearingDown);
    device.destroy().map_err(HarnessError::Teardown)?;
    drop(context);
    report.stale_notifications += drain(&mut backend.monitor)?;
    logs.finish(config.keep_logs)?;

    report.enter(RunState::Done);
    info!(
        name = %iteration.name,
        frames = report.frames,
        updates = report.field_updates,
        library_events = report.library_events,
        elapsed = ?started.elapsed(),
        "iteration finished"
    );
    Ok(report)
}

/// Polls until the monitor announces `devnode`. Timeouts are not errors;
/// the wait backs off briefly and polls again.
fn await_enumeration<M: HotplugMonitor>(
    monitor: &mut M,
    devnode: &Path,
    config: &Config,
    report: &mut IterationReport,
) -> Result<(), HarnessError> {
    loop {
        match monitor
            .poll(config.poll_timeout)
            .map_err(HarnessError::Enumeration)?
        {
            Some(hotplug) if hotplug.is_add_of(devnode) => return Ok(()),
            Some(hotplug) => {
                trace!(?hotplug, "ignoring unrelated notification");
                report.foreign_notifications += 1;
            }
            None => {
                report.enumeration_timeouts += 1;
                warn!(
                    devnode = %devnode.display(),
                    waited = ?config.poll_timeout,
                    "device not announced yet, retrying"
                );
                if !config.poll_backoff.is_zero() {
                    thread::sleep(config.poll_backoff);
                }
            }
        }
    }
}

fn dispatch<X: LibraryContext>(context: &mut X) -> Result<u64, HarnessError> {
    let drained = context.dispatch_and_drain().map_err(HarnessError::Dispatch)?;
    Ok(drained as u64)
}

fn drain<M: HotplugMonitor>(monitor: &mut M) -> Result<u64, HarnessError> {
    let dropped = monitor.drain().map_err(HarnessError::Enumeration)?;
    if dropped > 0 {
        trace!(dropped, "discarded queued notifications");
    }
    Ok(dropped as u64)
}
