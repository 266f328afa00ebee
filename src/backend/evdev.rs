//! Reading from evdev device nodes: capability read-back, and the evdev
//! consumer that stands in as the library under test.

use super::{CapabilityReader, InputLibrary, LibraryContext};
use crate::capability::{AbsInfo, CapabilitySet, DeviceId, DeviceSnapshot};
use crate::codes::{self, EV_ABS, EV_MAX};
use crate::event;
use input_linux_sys as sys;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::mem;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

const NAME_BUFFER: usize = 256;
const PROP_BYTES: usize = 4;
const WORD_BYTES: usize = mem::size_of::<libc::c_ulong>();
const WORD_BITS: usize = WORD_BYTES * 8;

/// Reads a device's negotiated capabilities through `EVIOCG*` ioctls.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvdevReader;

impl CapabilityReader for EvdevReader {
    fn extract(&mut self, devnode: &Path) -> io::Result<DeviceSnapshot> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(devnode)?;
        let fd = file.as_raw_fd();

        let mut name = [0; NAME_BUFFER];
        // SAFETY: fd is an open evdev node; the kernel writes at most
        // `name.len()` bytes.
        unsafe { sys::ev_get_name(fd, &mut name) }.map_err(io::Error::from)?;
        let name: Vec<u8> = name.iter().map(|&b| b as u8).take_while(|&b| b != 0).collect();
        let name = String::from_utf8_lossy(&name).into_owned();

        // SAFETY: input_id is plain data; all-zero is a valid value.
        let mut id: sys::input_id = unsafe { mem::zeroed() };
        // SAFETY: `id` is a valid, writable input_id.
        unsafe { sys::ev_get_id(fd, &mut id) }.map_err(io::Error::from)?;

        let mut properties = [0; PROP_BYTES];
        // SAFETY: as for the name, the buffer length bounds the write.
        unsafe { sys::ev_get_prop(fd, &mut properties) }.map_err(io::Error::from)?;

        let (capabilities, bare_types) =
            read_capabilities(|type_, max| read_bits(fd, type_, max), |code| read_abs(fd, code))?;

        Ok(DeviceSnapshot {
            name,
            id: DeviceId {
                bustype: id.bustype,
                vendor: id.vendor,
                product: id.product,
                version: id.version,
            },
            properties: properties.iter().map(|&b| b as u8).collect(),
            capabilities,
            bare_types,
        })
    }
}

/// A kernel bitmap as returned by `EVIOCGBIT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    words: Vec<libc::c_ulong>,
}

impl Bitmap {
    pub fn from_bits(bits: &[u16]) -> Self {
        let mut words = Vec::new();
        for &bit in bits {
            let (word, shift) = (bit as usize / WORD_BITS, bit as usize % WORD_BITS);
            if words.len() <= word {
                words.resize(word + 1, 0);
            }
            words[word] |= 1 << shift;
        }
        Bitmap { words }
    }

    fn from_ne_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks_exact(WORD_BYTES)
            .map(|chunk| {
                let mut word = [0u8; WORD_BYTES];
                word.copy_from_slice(chunk);
                libc::c_ulong::from_ne_bytes(word)
            })
            .collect();
        Bitmap { words }
    }

    pub fn is_set(&self, bit: u16) -> bool {
        let bit = bit as usize;
        self.words
            .get(bit / WORD_BITS)
            .is_some_and(|w| (w >> (bit % WORD_BITS)) & 1 == 1)
    }
}

/// Walks the category bitmap and collects every supported code.
///
/// `bits(type_, max)` is `EVIOCGBIT`; type 0 asks for the category bitmap.
/// It is only called for categories that have a code bitmap, since evdev
/// rejects the request with `EINVAL` for any other. Set categories without
/// one are returned separately as bare types.
pub fn read_capabilities<B, A>(mut bits: B, mut abs: A) -> io::Result<(CapabilitySet, Vec<u16>)>
where
    B: FnMut(u16, u16) -> io::Result<Bitmap>,
    A: FnMut(u16) -> io::Result<AbsInfo>,
{
    let types = bits(0, EV_MAX)?;
    let mut capabilities = CapabilitySet::new();
    let mut bare_types = Vec::new();
    for type_ in 1..=EV_MAX {
        if !types.is_set(type_) {
            continue;
        }
        let max = match codes::type_max(type_) {
            Some(max) if codes::has_code_bitmap(type_) => max,
            _ => {
                bare_types.push(type_);
                continue;
            }
        };
        let has_code = bits(type_, max)?;
        for code in (0..=max).filter(|&code| has_code.is_set(code)) {
            let info = if type_ == EV_ABS {
                Some(abs(code)?)
            } else {
                None
            };
            capabilities.enable(type_, code, info);
        }
    }
    Ok((capabilities, bare_types))
}

fn read_bits(fd: RawFd, type_: u16, max: u16) -> io::Result<Bitmap> {
    let mut buf = vec![0u8; (max as usize / WORD_BITS + 1) * WORD_BYTES];
    // SAFETY: fd is an open evdev node; the request encodes `buf.len()`.
    unsafe { sys::ev_get_bit(fd, type_.into(), &mut buf) }.map_err(io::Error::from)?;
    Ok(Bitmap::from_ne_bytes(&buf))
}

fn read_abs(fd: RawFd, code: u16) -> io::Result<AbsInfo> {
    // SAFETY: input_absinfo is plain data; all-zero is a valid value.
    let mut abs: sys::input_absinfo = unsafe { mem::zeroed() };
    // SAFETY: `abs` is a valid, writable input_absinfo.
    unsafe { sys::ev_get_abs(fd, code.into(), &mut abs) }.map_err(io::Error::from)?;
    Ok(AbsInfo {
        value: abs.value,
        minimum: abs.minimum,
        maximum: abs.maximum,
        fuzz: abs.fuzz,
        flat: abs.flat,
        resolution: abs.resolution,
    })
}

/// Plain evdev consumer: opens the device node and, on every dispatch,
/// reads all pending events and describes each one in its diagnostic log.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvdevLibrary;

impl InputLibrary for EvdevLibrary {
    type Context = EvdevContext;

    fn create_context(
        &mut self,
        devnode: &Path,
        mut sink: Box<dyn Write>,
    ) -> io::Result<EvdevContext> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(devnode)?;
        writeln!(sink, "{}: opened for reading", devnode.display())?;
        Ok(EvdevContext {
            file,
            devnode: devnode.to_path_buf(),
            sink,
            first_event_us: None,
        })
    }
}

pub struct EvdevContext {
    file: File,
    devnode: PathBuf,
    sink: Box<dyn Write>,
    first_event_us: Option<u64>,
}

impl std::fmt::Debug for EvdevContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevContext")
            .field("devnode", &self.devnode)
            .finish_non_exhaustive()
    }
}

impl LibraryContext for EvdevContext {
    fn dispatch_and_drain(&mut self) -> io::Result<usize> {
        let mut drained = 0;
        loop {
            let ev = match event::read_event(&mut self.file) {
                Ok(Some(ev)) => ev,
                Ok(None) => break,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            };
            drained += 1;
            let event_us = event::event_microseconds(&ev);
            let first = *self.first_event_us.get_or_insert(event_us);
            writeln!(
                self.sink,
                "event: {} +{:>10}us {} {} {}",
                self.devnode.display(),
                event_us.saturating_sub(first),
                codes::type_name(ev.type_),
                codes::code_name(ev.type_, ev.code),
                ev.value
            )?;
        }
        Ok(drained)
    }
}

impl Drop for EvdevContext {
    fn drop(&mut self) {
        let _ = writeln!(self.sink, "{}: closed", self.devnode.display());
    }
}
