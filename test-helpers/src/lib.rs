//! In-memory backends and helpers shared by tests and benchmarks.
//!
//! [`MockWorld`] hands out a driver, monitor, reader and library that all
//! share one journal, so a test can run the real harness loop and then look
//! at every device created, every event injected and every notification
//! consumed.

use fuzzy_device::backend::{
    Backend, CapabilityReader, Hotplug, HotplugAction, HotplugMonitor, InputLibrary,
    LibraryContext, LiveDevice, VirtualDeviceDriver,
};
use fuzzy_device::backend::evdev::{read_capabilities, Bitmap};
use fuzzy_device::capability::{AbsInfo, DeviceDescription, DeviceId, DeviceSnapshot};
use fuzzy_device::codes;
use fuzzy_device::config::Config;
use fuzzy_device::event::{Clock, FieldUpdate, Timestamp};
use fuzzy_device::recorder::{self, LoggedEvent};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Everything the mock backends did, in order.
#[derive(Debug, Default)]
pub struct Journal {
    pub created: Vec<DeviceDescription>,
    /// Device node of each created device, in creation order.
    pub nodes: Vec<PathBuf>,
    pub injected: Vec<(PathBuf, FieldUpdate)>,
    pub destroyed: Vec<PathBuf>,
    /// Devices dropped without an explicit destroy.
    pub released: Vec<PathBuf>,
    pub contexts_opened: usize,
    pub contexts_closed: usize,
    pub dispatches: usize,
    live: HashMap<PathBuf, DeviceDescription>,
    /// `None` entries make one poll time out.
    notifications: VecDeque<Option<Hotplug>>,
    next_node: u32,
}

pub type SharedJournal = Rc<RefCell<Journal>>;

/// Behaviour knobs for the mock backends.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Polls that time out before the device is announced.
    pub timeouts_before_add: usize,
    /// Unrelated notifications delivered before the device is announced.
    pub foreign_before_add: usize,
    /// Categories the "kernel" silently refuses.
    pub refused_types: Vec<u16>,
    pub fail_create: bool,
    /// Fail the n-th injected event (0-based, counted per device).
    pub fail_inject_at: Option<usize>,
}

pub type MockBackend = Backend<MockDriver, MockMonitor, MockReader, MockLibrary>;

#[derive(Debug, Default)]
pub struct MockWorld {
    pub journal: SharedJournal,
    pub options: MockOptions,
}

impl MockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MockOptions) -> Self {
        MockWorld {
            journal: SharedJournal::default(),
            options,
        }
    }

    pub fn backend(&self) -> MockBackend {
        Backend {
            driver: MockDriver {
                journal: Rc::clone(&self.journal),
                options: self.options.clone(),
            },
            monitor: MockMonitor {
                journal: Rc::clone(&self.journal),
                polls: 0,
            },
            reader: MockReader {
                journal: Rc::clone(&self.journal),
                refused_types: self.options.refused_types.clone(),
            },
            library: MockLibrary {
                journal: Rc::clone(&self.journal),
            },
        }
    }

    /// Events injected so far, sync markers included.
    pub fn injected(&self) -> Vec<FieldUpdate> {
        self.journal.borrow().injected.iter().map(|(_, u)| *u).collect()
    }

    /// Events injected into the `index`-th created device.
    pub fn injected_into(&self, index: usize) -> Vec<FieldUpdate> {
        let j = self.journal.borrow();
        let Some(node) = j.nodes.get(index) else {
            return Vec::new();
        };
        j.injected
            .iter()
            .filter(|(n, _)| n == node)
            .map(|(_, u)| *u)
            .collect()
    }

    /// Notifications still queued in the monitor.
    pub fn pending_notifications(&self) -> usize {
        self.journal.borrow().notifications.len()
    }
}

#[derive(Debug)]
pub struct MockDriver {
    journal: SharedJournal,
    options: MockOptions,
}

impl VirtualDeviceDriver for MockDriver {
    type Device = MockDevice;

    fn create(&mut self, description: &DeviceDescription) -> io::Result<MockDevice> {
        if self.options.fail_create {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "uinput unavailable"));
        }
        let mut j = self.journal.borrow_mut();
        let devnode = PathBuf::from(format!("/dev/input/event{}", 100 + j.next_node));
        j.next_node += 1;
        j.created.push(description.clone());
        j.nodes.push(devnode.clone());
        j.live.insert(devnode.clone(), description.clone());

        for i in 0..self.options.foreign_before_add {
            j.notifications.push_back(Some(Hotplug {
                action: HotplugAction::Add,
                devnode: Some(PathBuf::from(format!("/dev/input/event{i}"))),
            }));
        }
        for _ in 0..self.options.timeouts_before_add {
            j.notifications.push_back(None);
        }
        j.notifications.push_back(Some(Hotplug {
            action: HotplugAction::Add,
            devnode: Some(devnode.clone()),
        }));
        // Stale follow-up the harness must drain before streaming.
        j.notifications.push_back(Some(Hotplug {
            action: HotplugAction::Change,
            devnode: Some(devnode.clone()),
        }));

        Ok(MockDevice {
            journal: Rc::clone(&self.journal),
            devnode,
            written: 0,
            fail_inject_at: self.options.fail_inject_at,
            destroyed: false,
        })
    }
}

#[derive(Debug)]
pub struct MockDevice {
    journal: SharedJournal,
    devnode: PathBuf,
    written: usize,
    fail_inject_at: Option<usize>,
    destroyed: bool,
}

impl MockDevice {
    fn remove(&mut self) {
        let mut j = self.journal.borrow_mut();
        j.live.remove(&self.devnode);
        j.notifications.push_back(Some(Hotplug {
            action: HotplugAction::Remove,
            devnode: Some(self.devnode.clone()),
        }));
        self.destroyed = true;
    }
}

impl LiveDevice for MockDevice {
    fn devnode(&self) -> &Path {
        &self.devnode
    }

    fn write_event(&mut self, type_: u16, code: u16, value: i32) -> io::Result<()> {
        if self.fail_inject_at == Some(self.written) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device went away"));
        }
        self.written += 1;
        self.journal
            .borrow_mut()
            .injected
            .push((self.devnode.clone(), FieldUpdate { type_, code, value }));
        Ok(())
    }

    fn destroy(mut self) -> io::Result<()> {
        self.remove();
        self.journal.borrow_mut().destroyed.push(self.devnode.clone());
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if !self.destroyed {
            self.remove();
            self.journal.borrow_mut().released.push(self.devnode.clone());
        }
    }
}

#[derive(Debug)]
pub struct MockMonitor {
    journal: SharedJournal,
    polls: usize,
}

impl MockMonitor {
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl HotplugMonitor for MockMonitor {
    fn poll(&mut self, _timeout: Duration) -> io::Result<Option<Hotplug>> {
        self.polls += 1;
        Ok(self.journal.borrow_mut().notifications.pop_front().flatten())
    }
}

#[derive(Debug)]
pub struct MockReader {
    journal: SharedJournal,
    refused_types: Vec<u16>,
}

impl CapabilityReader for MockReader {
    /// Answers the read-back the way evdev does: one bitmap per category
    /// that has one, `EINVAL` for any other.
    fn extract(&mut self, devnode: &Path) -> io::Result<DeviceSnapshot> {
        let j = self.journal.borrow();
        let Some(description) = j.live.get(devnode) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such device"));
        };
        let caps = &description.capabilities;
        let mut types: Vec<u16> = caps
            .types()
            .into_iter()
            .filter(|t| !self.refused_types.contains(t))
            .collect();
        types.push(codes::EV_SYN);

        let (capabilities, bare_types) = read_capabilities(
            |type_, _max| {
                if type_ == codes::EV_SYN {
                    return Ok(Bitmap::from_bits(&types));
                }
                if !codes::has_code_bitmap(type_) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "EVIOCGBIT: category has no code bitmap",
                    ));
                }
                let set: Vec<u16> = caps.codes(type_).map(|(code, _)| code).collect();
                Ok(Bitmap::from_bits(&set))
            },
            |code| Ok(caps.abs_info(code).unwrap_or(AbsInfo::SAMPLED)),
        )?;

        Ok(DeviceSnapshot {
            name: description.name.clone(),
            id: DeviceId {
                bustype: 0x06,
                ..DeviceId::default()
            },
            properties: vec![0; 4],
            capabilities,
            bare_types,
        })
    }
}

#[derive(Debug)]
pub struct MockLibrary {
    journal: SharedJournal,
}

impl InputLibrary for MockLibrary {
    type Context = MockContext;

    fn create_context(
        &mut self,
        devnode: &Path,
        mut sink: Box<dyn Write>,
    ) -> io::Result<MockContext> {
        writeln!(sink, "{}: opened", devnode.display())?;
        let mut j = self.journal.borrow_mut();
        j.contexts_opened += 1;
        Ok(MockContext {
            journal: Rc::clone(&self.journal),
            sink,
            cursor: j.injected.len(),
        })
    }
}

/// Reports every event injected since the previous dispatch.
pub struct MockContext {
    journal: SharedJournal,
    sink: Box<dyn Write>,
    cursor: usize,
}

impl LibraryContext for MockContext {
    fn dispatch_and_drain(&mut self) -> io::Result<usize> {
        let mut j = self.journal.borrow_mut();
        j.dispatches += 1;
        let drained = j.injected.len() - self.cursor;
        self.cursor = j.injected.len();
        writeln!(self.sink, "dispatched {drained}")?;
        Ok(drained)
    }
}

impl Drop for MockContext {
    fn drop(&mut self) {
        self.journal.borrow_mut().contexts_closed += 1;
    }
}

/// Clock that advances by a fixed step on every reading.
#[derive(Debug, Clone)]
pub struct StepClock {
    now_us: u64,
    step_us: u64,
}

impl StepClock {
    pub fn new(start_us: u64, step_us: u64) -> Self {
        StepClock {
            now_us: start_us,
            step_us,
        }
    }
}

impl Default for StepClock {
    fn default() -> Self {
        StepClock::new(1_000_000, 250)
    }
}

impl Clock for StepClock {
    fn now(&mut self) -> Timestamp {
        let ts = Timestamp::from_micros(self.now_us);
        self.now_us += self.step_us;
        ts
    }
}

/// Test configuration writing logs to `dir`, with no waiting between polls.
pub fn config_in(dir: &Path, seed: u64) -> Config {
    let mut cfg = Config::with_seed(seed);
    cfg.log_dir = dir.to_path_buf();
    cfg.poll_timeout = Duration::from_millis(1);
    cfg.poll_backoff = Duration::ZERO;
    cfg
}

/// All `E:` lines of an event log.
pub fn logged_events(text: &str) -> Vec<LoggedEvent> {
    text.lines().filter_map(recorder::parse_event_line).collect()
}
