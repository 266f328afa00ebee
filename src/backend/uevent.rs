//! Hotplug notifications from a `NETLINK_KOBJECT_UEVENT` socket.
//!
//! Listens on either the udev multicast group (messages re-broadcast by the
//! udev daemon once the device node is ready) or the raw kernel group, and
//! reports only `SUBSYSTEM=input` messages.

use super::{Hotplug, HotplugAction, HotplugMonitor};
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::trace;

const UDEV_MONITOR_PREFIX: &[u8] = b"libudev\0";
const UDEV_MONITOR_MAGIC: u32 = 0xfeed_cafe;
const RECV_BUFFER: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UeventSource {
    /// Messages forwarded by the udev daemon.
    Udev,
    /// Raw kernel messages, for systems without a udev daemon.
    Kernel,
}

impl UeventSource {
    fn group(self) -> u32 {
        match self {
            UeventSource::Kernel => 1,
            UeventSource::Udev => 2,
        }
    }
}

#[derive(Debug)]
pub struct UeventMonitor {
    fd: OwnedFd,
    source: UeventSource,
}

impl UeventMonitor {
    pub fn open(source: UeventSource) -> io::Result<Self> {
        // SAFETY: plain socket(2) call; the result is checked below.
        let raw = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_DGRAM | libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
                libc::NETLINK_KOBJECT_UEVENT,
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` is a freshly created descriptor we own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: sockaddr_nl is plain data; all-zero is a valid value.
        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        addr.nl_groups = source.group();
        // SAFETY: `addr` is a valid sockaddr_nl and the length matches.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(UeventMonitor { fd, source })
    }

    pub fn source(&self) -> UeventSource {
        self.source
    }

    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
        // SAFETY: one valid pollfd.
        let rc = unsafe { libc::poll(&mut pfd, 1, ms) };
        match rc {
            n if n < 0 => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
            0 => Ok(false),
            _ => Ok(true),
        }
    }

    fn receive(&self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; RECV_BUFFER];
        // SAFETY: `buf` is valid for `buf.len()` bytes.
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                _ => Err(err),
            };
        }
        buf.truncate(n as usize);
        Ok(Some(buf))
    }
}

impl HotplugMonitor for UeventMonitor {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Hotplug>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !self.wait_readable(remaining)? {
                return Ok(None);
            }
            if let Some(msg) = self.receive()? {
                if let Some(uevent) = parse_uevent(&msg) {
                    if uevent.subsystem.as_deref() == Some("input") {
                        trace!(action = %uevent.action, devnode = ?uevent.devnode, "uevent");
                        return Ok(Some(uevent.into_hotplug()));
                    }
                }
            }
            // Not an input message; keep reading until the deadline.
        }
    }
}

/// A parsed uevent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uevent {
    pub action: String,
    pub subsystem: Option<String>,
    pub devnode: Option<PathBuf>,
}

impl Uevent {
    fn into_hotplug(self) -> Hotplug {
        Hotplug {
            action: HotplugAction::parse(&self.action),
            devnode: self.devnode,
        }
    }
}

/// Parses a udev-monitor message (`libudev\0` header) or a raw kernel
/// message (`action@devpath\0KEY=VALUE\0...`).
pub fn parse_uevent(msg: &[u8]) -> Option<Uevent> {
    let properties = if msg.starts_with(UDEV_MONITOR_PREFIX) {
        if msg.len() < 24 {
            return None;
        }
        let word = |at: usize| -> Option<u32> {
            let bytes = msg.get(at..at + 4)?;
            Some(u32::from_ne_bytes(bytes.try_into().ok()?))
        };
        let magic = u32::from_be_bytes(msg.get(8..12)?.try_into().ok()?);
        if magic != UDEV_MONITOR_MAGIC {
            return None;
        }
        let offset = word(16)? as usize;
        let len = word(20)? as usize;
        msg.get(offset..offset.checked_add(len)?)?
    } else {
        let header_end = msg.iter().position(|&b| b == 0)?;
        if !msg[..header_end].contains(&b'@') {
            return None;
        }
        msg.get(header_end + 1..)?
    };

    let mut action = None;
    let mut subsystem = None;
    let mut devname = None;
    for field in properties.split(|&b| b == 0) {
        let Ok(field) = std::str::from_utf8(field) else {
            continue;
        };
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "ACTION" => action = Some(value.to_string()),
            "SUBSYSTEM" => subsystem = Some(value.to_string()),
            "DEVNAME" => devname = Some(value.to_string()),
            _ => {}
        }
    }

    // Kernel messages carry DEVNAME relative to /dev.
    let devnode = devname.map(|name| {
        if name.starts_with('/') {
            PathBuf::from(name)
        } else {
            PathBuf::from("/dev").join(name)
        }
    });

    Some(Uevent {
        action: action?,
        subsystem,
        devnode,
    })
}
