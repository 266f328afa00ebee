use crate::codes::{EV_SYN, SYN_REPORT};
use input_linux_sys::{input_event, timeval};
use std::io::{self, Read, Write};
use std::mem::size_of;

/// One field update: `{category, code, value}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldUpdate {
    pub type_: u16,
    pub code: u16,
    pub value: i32,
}

impl FieldUpdate {
    pub const SYN_REPORT: FieldUpdate = FieldUpdate {
        type_: EV_SYN,
        code: SYN_REPORT,
        value: 0,
    };

    #[inline]
    pub fn is_sync_marker(&self) -> bool {
        *self == Self::SYN_REPORT
    }
}

/// A burst of updates. `updates` always ends with exactly one
/// [`FieldUpdate::SYN_REPORT`], even when no field was updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub timestamp: Timestamp,
    /// Microseconds since the previous frame (or since the stream started).
    pub delta_us: u64,
    pub updates: Vec<FieldUpdate>,
}

impl EventFrame {
    /// Updates excluding the trailing sync marker.
    pub fn fields(&self) -> &[FieldUpdate] {
        let n = self.updates.len().saturating_sub(1);
        &self.updates[..n]
    }
}

/// Seconds + microseconds, as written to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    pub sec: u64,
    pub usec: u32,
}

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp {
            sec: us / 1_000_000,
            usec: (us % 1_000_000) as u32,
        }
    }

    #[inline]
    pub fn as_micros(&self) -> u64 {
        self.sec * 1_000_000 + u64::from(self.usec)
    }
}

/// Source of frame timestamps.
pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// `CLOCK_MONOTONIC`, the clock the kernel stamps evdev events with by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        let mut tp = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `tp` is a valid, writable timespec.
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut tp) };
        Timestamp {
            sec: tp.tv_sec.max(0) as u64,
            usec: (tp.tv_nsec.max(0) / 1000) as u32,
        }
    }
}

/// Builds a raw `input_event`. The kernel stamps injected events itself, so
/// the time is left zeroed.
pub fn to_input_event(update: &FieldUpdate) -> input_event {
    input_event {
        time: timeval {
            tv_sec: 0,
            tv_usec: 0,
        },
        type_: update.type_,
        code: update.code,
        value: update.value,
    }
}

/// Reads a single `input_event` from the reader. Returns Ok(None) on EOF.
pub fn read_event(reader: &mut impl Read) -> io::Result<Option<input_event>> {
    let mut buf = vec![0u8; size_of::<input_event>()];
    match reader.read_exact(&mut buf) {
        Ok(()) => {
            // SAFETY: evdev hands out whole input_event records.
            let event: input_event = unsafe { std::ptr::read_unaligned(buf.as_ptr() as *const _) };
            Ok(Some(event))
        }
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Writes a single input_event to the writer.
pub fn write_event(writer: &mut impl Write, event: &input_event) -> io::Result<()> {
    // SAFETY: `event` is a valid input_event. Creates a byte slice representation.
    let buf: &[u8] = unsafe {
        std::slice::from_raw_parts(event as *const _ as *const u8, size_of::<input_event>())
    };
    writer.write_all(buf)
}

/// Calculates the event timestamp in microseconds from its timeval.
#[inline]
pub fn event_microseconds(event: &input_event) -> u64 {
    (event.time.tv_sec.max(0) as u64) * 1_000_000 + (event.time.tv_usec.max(0) as u64)
}
