//! Virtual devices through `/dev/uinput`.

use super::{LiveDevice, VirtualDeviceDriver};
use crate::capability::{AbsInfo, DeviceDescription};
use crate::codes::{self, EV_ABS, EV_FF, EV_KEY, EV_LED, EV_MSC, EV_REL, EV_SND, EV_SW, EV_SYN};
use crate::event::{self, FieldUpdate};
use input_linux_sys as sys;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BUS_VIRTUAL: u16 = 0x06;
/// The kernel refuses EV_FF devices that can't hold any effect.
const FF_EFFECTS_MAX: u32 = 10;

#[derive(Debug, Clone)]
pub struct UinputDriver {
    path: PathBuf,
    sysfs_root: PathBuf,
}

impl Default for UinputDriver {
    fn default() -> Self {
        UinputDriver {
            path: PathBuf::from("/dev/uinput"),
            sysfs_root: PathBuf::from("/sys/devices/virtual/input"),
        }
    }
}

impl UinputDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VirtualDeviceDriver for UinputDriver {
    type Device = UinputDevice;

    fn create(&mut self, description: &DeviceDescription) -> io::Result<UinputDevice> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(&self.path)?;
        let fd = file.as_raw_fd();
        let caps = &description.capabilities;

        for type_ in caps.types() {
            if type_ == EV_SYN {
                continue;
            }
            // SAFETY: fd is an open uinput handle that has not been created yet.
            unsafe { sys::ui_set_evbit(fd, type_.into()) }.map_err(io::Error::from)?;
            // Categories without a code bitmap only get their type bit.
            if !codes::has_code_bitmap(type_) {
                continue;
            }
            for (code, _) in caps.codes(type_) {
                set_code_bit(fd, type_, code)?;
            }
        }

        // SAFETY: uinput_setup is plain data; all-zero is a valid value.
        let mut setup: sys::uinput_setup = unsafe { mem::zeroed() };
        setup.id = sys::input_id {
            bustype: BUS_VIRTUAL,
            vendor: 0,
            product: 0,
            version: 0,
        };
        // Leave room for the terminating NUL.
        let room = setup.name.len() - 1;
        for (dst, &src) in setup.name.iter_mut().zip(description.name.as_bytes()).take(room) {
            *dst = src as _;
        }
        setup.ff_effects_max = if caps.has_type(EV_FF) { FF_EFFECTS_MAX } else { 0 };
        // SAFETY: `setup` outlives the call.
        unsafe { sys::ui_dev_setup(fd, &setup) }.map_err(io::Error::from)?;

        for (code, abs) in caps.codes(EV_ABS) {
            let abs = abs.unwrap_or(AbsInfo::SAMPLED);
            // SAFETY: uinput_abs_setup is plain data; all-zero is a valid value.
            let mut abs_setup: sys::uinput_abs_setup = unsafe { mem::zeroed() };
            abs_setup.code = code;
            abs_setup.absinfo = sys::input_absinfo {
                value: abs.value,
                minimum: abs.minimum,
                maximum: abs.maximum,
                fuzz: abs.fuzz,
                flat: abs.flat,
                resolution: abs.resolution,
            };
            // SAFETY: `abs_setup` outlives the call.
            unsafe { sys::ui_abs_setup(fd, &abs_setup) }.map_err(io::Error::from)?;
        }

        // SAFETY: setup is complete; UI_DEV_CREATE takes no argument.
        unsafe { sys::ui_dev_create(fd) }.map_err(io::Error::from)?;
        let mut device = UinputDevice {
            file,
            devnode: PathBuf::new(),
            created: true,
        };
        let sysname = device.sysname()?;
        device.devnode = find_devnode(&self.sysfs_root.join(&sysname))?;
        debug!(
            name = %description.name,
            sysname = %sysname,
            devnode = %device.devnode.display(),
            "uinput device created"
        );
        Ok(device)
    }
}

/// `UI_SET_*BIT` for one code of a category with a code bitmap.
fn set_code_bit(fd: RawFd, type_: u16, code: u16) -> io::Result<()> {
    // SAFETY: fd is an open uinput handle; these requests take the code by value.
    let res = unsafe {
        match type_ {
            EV_KEY => sys::ui_set_keybit(fd, code.into()),
            EV_REL => sys::ui_set_relbit(fd, code.into()),
            EV_ABS => sys::ui_set_absbit(fd, code.into()),
            EV_MSC => sys::ui_set_mscbit(fd, code.into()),
            EV_SW => sys::ui_set_swbit(fd, code.into()),
            EV_LED => sys::ui_set_ledbit(fd, code.into()),
            EV_SND => sys::ui_set_sndbit(fd, code.into()),
            EV_FF => sys::ui_set_ffbit(fd, code.into()),
            _ => return Ok(()),
        }
    };
    res.map(drop).map_err(io::Error::from)
}

/// Looks for the `eventN` child of a sysfs input device.
fn find_devnode(sysdir: &Path) -> io::Result<PathBuf> {
    for entry in fs::read_dir(sysdir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(name) = name.to_str() {
            if name.starts_with("event") {
                return Ok(Path::new("/dev/input").join(name));
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no event node under {}", sysdir.display()),
    ))
}

#[derive(Debug)]
pub struct UinputDevice {
    file: File,
    devnode: PathBuf,
    created: bool,
}

impl UinputDevice {
    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    fn sysname(&self) -> io::Result<String> {
        let mut buf = [0; 64];
        // SAFETY: the device is created; the kernel writes at most `buf.len()` bytes.
        unsafe { sys::ui_get_sysname(self.fd(), &mut buf) }.map_err(io::Error::from)?;
        let name: Vec<u8> = buf.iter().map(|&b| b as u8).take_while(|&b| b != 0).collect();
        Ok(String::from_utf8_lossy(&name).into_owned())
    }

    fn destroy_in_place(&mut self) -> io::Result<()> {
        if !self.created {
            return Ok(());
        }
        self.created = false;
        // SAFETY: fd is the uinput handle the device was created on.
        unsafe { sys::ui_dev_destroy(self.fd()) }
            .map(drop)
            .map_err(io::Error::from)
    }
}

impl LiveDevice for UinputDevice {
    fn devnode(&self) -> &Path {
        &self.devnode
    }

    fn write_event(&mut self, type_: u16, code: u16, value: i32) -> io::Result<()> {
        let ev = event::to_input_event(&FieldUpdate { type_, code, value });
        event::write_event(&mut self.file, &ev)
    }

    fn destroy(mut self) -> io::Result<()> {
        self.destroy_in_place()
    }
}

impl Drop for UinputDevice {
    fn drop(&mut self) {
        if let Err(e) = self.destroy_in_place() {
            warn!(
                devnode = %self.devnode.display(),
                error = %e,
                "failed to destroy uinput device"
            );
        }
    }
}
