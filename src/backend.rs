//! Interfaces to the things the harness drives but does not implement: the
//! virtual-device driver, the hotplug monitor, capability read-back and the
//! library under test. The Linux implementations live in the submodules;
//! tests substitute in-memory ones.

pub mod evdev;
#[cfg(feature = "libinput")]
pub mod libinput;
pub mod uevent;
pub mod uinput;

use crate::capability::{DeviceDescription, DeviceSnapshot};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use evdev::{EvdevLibrary, EvdevReader};
#[cfg(feature = "libinput")]
pub use libinput::LibinputLibrary;
pub use uevent::{UeventMonitor, UeventSource};
pub use uinput::UinputDriver;

/// Creates virtual devices.
pub trait VirtualDeviceDriver {
    type Device: LiveDevice;

    fn create(&mut self, description: &DeviceDescription) -> io::Result<Self::Device>;
}

/// A realized device. Dropping it without calling [`LiveDevice::destroy`]
/// still releases it.
pub trait LiveDevice {
    /// Device node, e.g. `/dev/input/event7`.
    fn devnode(&self) -> &Path;

    fn write_event(&mut self, type_: u16, code: u16, value: i32) -> io::Result<()>;

    fn destroy(self) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
    Change,
    Other,
}

impl HotplugAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "add" => HotplugAction::Add,
            "remove" => HotplugAction::Remove,
            "change" => HotplugAction::Change,
            _ => HotplugAction::Other,
        }
    }
}

/// One device notification from the hotplug monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotplug {
    pub action: HotplugAction,
    pub devnode: Option<PathBuf>,
}

impl Hotplug {
    /// True if this announces the arrival of `devnode`.
    pub fn is_add_of(&self, devnode: &Path) -> bool {
        self.action == HotplugAction::Add && self.devnode.as_deref() == Some(devnode)
    }
}

pub trait HotplugMonitor {
    /// Waits up to `timeout` for a notification.
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Hotplug>>;

    /// Discards every queued notification without blocking. Returns how
    /// many were dropped.
    fn drain(&mut self) -> io::Result<usize> {
        let mut dropped = 0;
        while self.poll(Duration::ZERO)?.is_some() {
            dropped += 1;
        }
        Ok(dropped)
    }
}

/// Reads back what a device node actually supports.
pub trait CapabilityReader {
    fn extract(&mut self, devnode: &Path) -> io::Result<DeviceSnapshot>;
}

/// The library under test.
pub trait InputLibrary {
    type Context: LibraryContext;

    /// Creates a context watching `devnode`. The context writes its
    /// diagnostics, at maximum verbosity, to `sink`.
    fn create_context(&mut self, devnode: &Path, sink: Box<dyn Write>)
        -> io::Result<Self::Context>;
}

pub trait LibraryContext {
    /// Dispatches and discards queued events until none remain. Returns how
    /// many were discarded.
    fn dispatch_and_drain(&mut self) -> io::Result<usize>;
}

/// The collaborators one harness run needs.
#[derive(Debug)]
pub struct Backend<D, M, R, L> {
    pub driver: D,
    pub monitor: M,
    pub reader: R,
    pub library: L,
}
