//! Per-iteration run logs.
//!
//! Each iteration writes two files: `<name>.evemu`, an evemu-style
//! capability header followed by every injected event, and `<name>.diag`,
//! whatever the library under test printed while the events were processed.
//! Lines are written straight to the file with no userspace buffering, so a
//! crash leaves everything up to the crashing event on disk.

use crate::capability::{DeviceDescription, DeviceSnapshot};
use crate::codes::{self, EV_ABS, EV_MAX};
use crate::error::HarnessError;
use crate::event::{FieldUpdate, Timestamp};
use crate::util;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Seed and sequence position that reproduce one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRecord {
    pub seed: u64,
    /// The selector draw taken just before the iteration started.
    pub random: u32,
    /// Draw index of `random` (1-based).
    pub draw: u64,
}

/// Locations of the two log files of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    pub events: PathBuf,
    pub diagnostics: PathBuf,
}

impl LogPaths {
    pub fn for_device(dir: &Path, name: &str) -> Self {
        LogPaths {
            events: dir.join(format!("{name}.evemu")),
            diagnostics: dir.join(format!("{name}.diag")),
        }
    }
}

/// Writer for the capability/event log.
#[derive(Debug)]
pub struct EventLog<W: Write> {
    out: W,
}

impl<W: Write> EventLog<W> {
    pub fn new(out: W) -> Self {
        EventLog { out }
    }

    /// Writes the device header: what was requested, then what the kernel
    /// actually accepted.
    pub fn write_header(
        &mut self,
        requested: &DeviceDescription,
        snapshot: &DeviceSnapshot,
    ) -> io::Result<()> {
        let mut s = String::new();
        s.push_str("# EVEMU 1.3\n");
        s.push_str(&format!("# Input device name: \"{}\"\n", snapshot.name));
        s.push_str(&format!(
            "# Input device ID: bus {:#04x} vendor {:#06x} product {:#06x} version {:#06x}\n",
            snapshot.id.bustype, snapshot.id.vendor, snapshot.id.product, snapshot.id.version
        ));

        s.push_str(&format!(
            "# Requested capabilities: {} bits\n",
            requested.requested_bits
        ));
        for (type_, code, _) in requested.capabilities.iter() {
            s.push_str(&format!(
                "#   {} {}\n",
                codes::type_name(type_),
                codes::code_name(type_, code)
            ));
        }

        s.push_str("# Supported events:\n");
        let caps = &snapshot.capabilities;
        for type_ in snapshot.types() {
            s.push_str(&format!(
                "#   Event type {} ({})\n",
                type_,
                codes::type_name(type_)
            ));
            for (code, abs) in caps.codes(type_) {
                s.push_str(&format!(
                    "#     Event code {} ({})\n",
                    code,
                    codes::code_name(type_, code)
                ));
                if let Some(abs) = abs {
                    s.push_str(&format!("#       Value     {:6}\n", abs.value));
                    s.push_str(&format!("#       Min       {:6}\n", abs.minimum));
                    s.push_str(&format!("#       Max       {:6}\n", abs.maximum));
                    s.push_str(&format!("#       Fuzz      {:6}\n", abs.fuzz));
                    s.push_str(&format!("#       Flat      {:6}\n", abs.flat));
                    s.push_str(&format!("#       Resolution {:5}\n", abs.resolution));
                }
            }
        }

        s.push_str("# Properties:\n");
        for (byte_idx, byte) in snapshot.properties.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    s.push_str(&format!("#   Property type {}\n", byte_idx * 8 + bit));
                }
            }
        }

        s.push_str(&format!("N: {}\n", snapshot.name));
        s.push_str(&format!(
            "I: {:04x} {:04x} {:04x} {:04x}\n",
            snapshot.id.bustype, snapshot.id.vendor, snapshot.id.product, snapshot.id.version
        ));
        push_mask_lines(&mut s, "P:", None, &snapshot.properties);

        let mut type_mask = vec![0u8; EV_MAX as usize / 8 + 1];
        type_mask[0] |= 1; // EV_SYN
        for type_ in snapshot.types() {
            type_mask[type_ as usize / 8] |= 1 << (type_ % 8);
        }
        push_mask_lines(&mut s, "B:", Some(0), &type_mask);
        for type_ in caps.types() {
            if codes::has_code_bitmap(type_) {
                push_mask_lines(&mut s, "B:", Some(type_), &caps.code_bitmask(type_));
            }
        }

        for (code, abs) in caps.codes(EV_ABS) {
            if let Some(abs) = abs {
                s.push_str(&format!(
                    "A: {:02x} {} {} {} {} {}\n",
                    code, abs.minimum, abs.maximum, abs.fuzz, abs.flat, abs.resolution
                ));
            }
        }

        self.out.write_all(s.as_bytes())?;
        self.out.flush()
    }

    /// Writes the seed/draw block that reproduces this run.
    pub fn write_run_record(&mut self, record: &RunRecord) -> io::Result<()> {
        write!(
            self.out,
            "#\n# seed: {}\n# random: {}\n# draw: {}\n#\n",
            record.seed, record.random, record.draw
        )?;
        self.out.flush()
    }

    /// Writes one field update line.
    pub fn write_update(&mut self, ts: Timestamp, update: &FieldUpdate) -> io::Result<()> {
        writeln!(
            self.out,
            "E: {}.{:06} {:04x} {:04x} {:04}    # {} / {:<20} {}",
            ts.sec,
            ts.usec,
            update.type_,
            update.code,
            update.value,
            codes::type_name(update.type_),
            codes::code_name(update.type_, update.code),
            update.value
        )
    }

    /// Writes the frame-terminating SYN_REPORT line, annotated with the time
    /// since the previous frame.
    pub fn write_sync(&mut self, ts: Timestamp, delta_us: u64) -> io::Result<()> {
        let marker = FieldUpdate::SYN_REPORT;
        writeln!(
            self.out,
            "E: {}.{:06} {:04x} {:04x} {:04}    # ------------ {} ({}) ---------- +{}",
            ts.sec,
            ts.usec,
            marker.type_,
            marker.code,
            marker.value,
            codes::code_name(marker.type_, marker.code),
            marker.value,
            util::format_us(delta_us)
        )
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn push_mask_lines(s: &mut String, tag: &str, type_: Option<u16>, mask: &[u8]) {
    for chunk in mask.chunks(8) {
        s.push_str(tag);
        if let Some(t) = type_ {
            s.push_str(&format!(" {t:02x}"));
        }
        for byte in chunk {
            s.push_str(&format!(" {byte:02x}"));
        }
        s.push('\n');
    }
}

/// Both log files of one iteration.
#[derive(Debug)]
pub struct RunLogs {
    paths: LogPaths,
    pub events: EventLog<File>,
    diagnostics: Option<File>,
}

impl RunLogs {
    pub fn create(dir: &Path, name: &str) -> Result<Self, HarnessError> {
        let paths = LogPaths::for_device(dir, name);
        let events = File::create(&paths.events).map_err(|source| HarnessError::Log {
            path: paths.events.clone(),
            source,
        })?;
        let diagnostics = File::create(&paths.diagnostics).map_err(|source| HarnessError::Log {
            path: paths.diagnostics.clone(),
            source,
        })?;
        Ok(RunLogs {
            paths,
            events: EventLog::new(events),
            diagnostics: Some(diagnostics),
        })
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    /// Hands the diagnostic log to the library context. Can be taken once.
    pub fn take_diagnostics(&mut self) -> Option<Box<dyn Write>> {
        self.diagnostics
            .take()
            .map(|file| Box::new(file) as Box<dyn Write>)
    }

    /// Maps an I/O error on the event log to a [`HarnessError`].
    pub fn event_error(&self, source: io::Error) -> HarnessError {
        HarnessError::Log {
            path: self.paths.events.clone(),
            source,
        }
    }

    /// Closes both files and, unless `keep` is set, removes them.
    pub fn finish(self, keep: bool) -> Result<(), HarnessError> {
        let RunLogs { paths, events, diagnostics } = self;
        drop(events);
        drop(diagnostics);
        if keep {
            debug!(events = %paths.events.display(), "keeping run logs");
            return Ok(());
        }
        for path in [&paths.events, &paths.diagnostics] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(HarnessError::Log {
                        path: path.clone(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

/// One `E:` line of an event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggedEvent {
    pub timestamp: Timestamp,
    pub update: FieldUpdate,
}

/// Parses an `E: <sec>.<usec> <type> <code> <value>` line. Anything after
/// the value (the symbolic comment) is ignored.
pub fn parse_event_line(line: &str) -> Option<LoggedEvent> {
    let rest = line.strip_prefix("E:")?;
    let mut fields = rest.split_whitespace();
    let (sec, usec) = fields.next()?.split_once('.')?;
    let type_ = u16::from_str_radix(fields.next()?, 16).ok()?;
    let code = u16::from_str_radix(fields.next()?, 16).ok()?;
    let value = fields.next()?.parse::<i32>().ok()?;
    if usec.len() != 6 {
        return None;
    }
    Some(LoggedEvent {
        timestamp: Timestamp {
            sec: sec.parse().ok()?,
            usec: usec.parse().ok()?,
        },
        update: FieldUpdate { type_, code, value },
    })
}

/// Extracts the run record block from a log's text.
pub fn parse_run_record(text: &str) -> Option<RunRecord> {
    let field = |key: &str| {
        text.lines()
            .find_map(|line| line.strip_prefix("# ")?.strip_prefix(key)?.strip_prefix(": "))
    };
    Some(RunRecord {
        seed: field("seed")?.trim().parse().ok()?,
        random: field("random")?.trim().parse().ok()?,
        draw: field("draw")?.trim().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{AbsInfo, CapabilitySet, DeviceId};
    use crate::codes::{EV_KEY, EV_SYN};

    fn snapshot() -> (DeviceDescription, DeviceSnapshot) {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_KEY, 30, None);
        caps.enable(EV_ABS, 0, Some(AbsInfo::SAMPLED));
        let desc = DeviceDescription {
            name: "fuzzydevice-000000".into(),
            requested_bits: 3,
            capabilities: caps.clone(),
        };
        let snap = DeviceSnapshot {
            name: "fuzzydevice-000000".into(),
            id: DeviceId {
                bustype: 0x06,
                ..DeviceId::default()
            },
            properties: vec![0],
            capabilities: caps,
            bare_types: Vec::new(),
        };
        (desc, snap)
    }

    #[test]
    fn header_lists_requested_and_supported_codes() {
        let (desc, snap) = snapshot();
        let mut log = EventLog::new(Vec::new());
        log.write_header(&desc, &snap).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert!(text.starts_with("# EVEMU 1.3\n"));
        assert!(text.contains("# Requested capabilities: 3 bits\n"));
        assert!(text.contains("#   EV_KEY KEY_A\n"));
        assert!(text.contains("#   Event type 3 (EV_ABS)\n"));
        assert!(text.contains("#     Event code 30 (KEY_A)\n"));
        assert!(text.contains("N: fuzzydevice-000000\n"));
        assert!(text.contains("I: 0006 0000 0000 0000\n"));
        assert!(text.contains("B: 00 0b 00 00 00\n"));
        assert!(text.contains("A: 00 0 100 0 0 0\n"));
    }

    #[test]
    fn bare_categories_get_a_type_bit_but_no_code_mask() {
        let (desc, mut snap) = snapshot();
        snap.bare_types = vec![codes::EV_REP];
        let mut log = EventLog::new(Vec::new());
        log.write_header(&desc, &snap).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert!(text.contains("#   Event type 20 (EV_REP)\n"));
        assert!(text.contains("B: 00 0b 00 10 00\n"));
        assert!(!text.contains("B: 14"));
    }

    #[test]
    fn event_lines_parse_back() {
        let mut log = EventLog::new(Vec::new());
        let ts = Timestamp {
            sec: 12,
            usec: 345,
        };
        let update = FieldUpdate {
            type_: EV_KEY,
            code: 30,
            value: 1,
        };
        log.write_update(ts, &update).unwrap();
        log.write_sync(ts, 1_500).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        let mut lines = text.lines();

        let first = lines.next().unwrap();
        assert_eq!(
            first,
            "E: 12.000345 0001 001e 0001    # EV_KEY / KEY_A                1"
        );
        assert_eq!(
            parse_event_line(first),
            Some(LoggedEvent {
                timestamp: ts,
                update
            })
        );

        let sync = parse_event_line(lines.next().unwrap()).unwrap();
        assert_eq!(sync.update.type_, EV_SYN);
        assert!(sync.update.is_sync_marker());
    }

    #[test]
    fn run_record_round_trips_through_text() {
        let record = RunRecord {
            seed: 1,
            random: 4_000_000_000,
            draw: 17,
        };
        let mut log = EventLog::new(Vec::new());
        log.write_run_record(&record).unwrap();
        let text = String::from_utf8(log.into_inner()).unwrap();
        assert_eq!(parse_run_record(&text), Some(record));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(parse_event_line("# comment"), None);
        assert_eq!(parse_event_line("E: 1.5 0001 001e 0001"), None);
        assert_eq!(parse_event_line("E: 1.000005 zz 001e 0001"), None);
        assert_eq!(parse_event_line("E:"), None);
    }

    #[test]
    fn finish_removes_files_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let logs = RunLogs::create(dir.path(), "a").unwrap();
        let paths = logs.paths().clone();
        logs.finish(false).unwrap();
        assert!(!paths.events.exists());
        assert!(!paths.diagnostics.exists());

        let logs = RunLogs::create(dir.path(), "b").unwrap();
        let paths = logs.paths().clone();
        logs.finish(true).unwrap();
        assert!(paths.events.exists());
        assert!(paths.diagnostics.exists());
    }
}
