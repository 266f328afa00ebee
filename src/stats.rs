use crate::driver::IterationReport;
use crate::util;
use chrono::{DateTime, Local};
use colored::*;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Totals over a whole harness run.
#[derive(Debug, Clone, Serialize)]
pub struct HarnessStats {
    pub seed: u64,
    /// Set when only one replayed iteration was run.
    pub replay: Option<u32>,
    pub iterations: u64,
    pub frames: u64,
    pub field_updates: u64,
    pub sync_markers: u64,
    /// Iterations whose device had no usable field and streamed nothing.
    pub empty_pool_iterations: u64,
    pub requested_bits: u64,
    pub negotiated_codes: u64,
    pub library_events: u64,
    pub enumeration_timeouts: u64,
    pub stale_notifications: u64,
    /// Last iteration started, with its selector draw.
    pub last_device: Option<String>,
    pub last_random: Option<u32>,
    pub interrupted: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub elapsed_ms: u64,
}

impl HarnessStats {
    pub fn new(seed: u64, replay: Option<u32>) -> Self {
        HarnessStats {
            seed,
            replay,
            iterations: 0,
            frames: 0,
            field_updates: 0,
            sync_markers: 0,
            empty_pool_iterations: 0,
            requested_bits: 0,
            negotiated_codes: 0,
            library_events: 0,
            enumeration_timeouts: 0,
            stale_notifications: 0,
            last_device: None,
            last_random: None,
            interrupted: false,
            started_at: Local::now(),
            finished_at: None,
            elapsed_ms: 0,
        }
    }

    pub fn record(&mut self, report: &IterationReport) {
        self.iterations += 1;
        self.frames += report.frames;
        self.field_updates += report.field_updates;
        self.sync_markers += report.sync_markers;
        if report.pool_size == 0 {
            self.empty_pool_iterations += 1;
        }
        self.requested_bits += u64::from(report.requested_bits);
        self.negotiated_codes += report.negotiated_codes as u64;
        self.library_events += report.library_events;
        self.enumeration_timeouts += report.enumeration_timeouts;
        self.stale_notifications += report.stale_notifications;
    }

    pub fn finish(&mut self, elapsed: Duration, interrupted: bool) {
        self.finished_at = Some(Local::now());
        self.elapsed_ms = elapsed.as_millis() as u64;
        self.interrupted = interrupted;
    }

    pub fn print_json(&self, mut writer: impl Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self).map_err(io::Error::from)?;
        writeln!(writer)
    }

    pub fn print_human(&self, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "{}", "--- fuzzy-device summary ---".bold().blue().underline())?;
        writeln!(w, "{} {}", "Seed:".bold(), self.seed.to_string().bright_yellow().bold())?;
        if let Some(random) = self.replay {
            writeln!(w, "{} {}", "Replayed random:".bold(), random.to_string().bright_yellow())?;
        }
        writeln!(
            w,
            "{} {}",
            "Iterations:".bold(),
            self.iterations.to_string().bright_white().bold()
        )?;
        writeln!(
            w,
            "{} {} ({} without usable fields)",
            "Frames:".bold(),
            self.frames.to_string().bright_green(),
            self.empty_pool_iterations
        )?;
        writeln!(
            w,
            "{} {}",
            "Field updates:".bold(),
            self.field_updates.to_string().bright_green()
        )?;
        writeln!(
            w,
            "{} {}",
            "Library events:".bold(),
            self.library_events.to_string().bright_cyan()
        )?;
        if self.iterations > 0 {
            writeln!(
                w,
                "{} {:.1} requested bits, {:.1} negotiated codes per device",
                "Average:".bold(),
                self.requested_bits as f64 / self.iterations as f64,
                self.negotiated_codes as f64 / self.iterations as f64
            )?;
        }
        if self.enumeration_timeouts > 0 {
            writeln!(
                w,
                "{} {}",
                "Enumeration timeouts:".bold(),
                self.enumeration_timeouts.to_string().yellow()
            )?;
        }
        if let (Some(name), Some(random)) = (&self.last_device, self.last_random) {
            writeln!(w, "{} {} (random {})", "Last device:".bold(), name, random)?;
        }
        writeln!(
            w,
            "{} {}{}",
            "Runtime:".bold(),
            util::format_duration(Duration::from_millis(self.elapsed_ms)),
            if self.interrupted {
                " (interrupted)".yellow().to_string()
            } else {
                String::new()
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(frames: u64, pool_size: usize) -> IterationReport {
        IterationReport {
            name: "dev".into(),
            requested_bits: 4,
            negotiated_codes: 3,
            pool_size,
            frames,
            field_updates: frames * 2,
            sync_markers: frames,
            library_events: frames * 3,
            ..IterationReport::default()
        }
    }

    #[test]
    fn record_accumulates() {
        let mut stats = HarnessStats::new(7, None);
        stats.record(&report(10, 3));
        stats.record(&report(0, 0));
        assert_eq!(stats.iterations, 2);
        assert_eq!(stats.frames, 10);
        assert_eq!(stats.field_updates, 20);
        assert_eq!(stats.sync_markers, 10);
        assert_eq!(stats.library_events, 30);
        assert_eq!(stats.empty_pool_iterations, 1);
        assert_eq!(stats.requested_bits, 8);
    }

    #[test]
    fn json_has_expected_fields() {
        let mut stats = HarnessStats::new(42, Some(9));
        stats.record(&report(5, 1));
        stats.finish(Duration::from_millis(1500), false);
        let mut out = Vec::new();
        stats.print_json(&mut out).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(v["seed"], 42);
        assert_eq!(v["replay"], 9);
        assert_eq!(v["iterations"], 1);
        assert_eq!(v["frames"], 5);
        assert_eq!(v["elapsed_ms"], 1500);
        assert!(v["finished_at"].is_string());
    }

    #[test]
    fn human_summary_mentions_seed() {
        colored::control::set_override(false);
        let mut stats = HarnessStats::new(1234, None);
        stats.finish(Duration::from_secs(1), true);
        let mut out = Vec::new();
        stats.print_human(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Seed: 1234"));
        assert!(text.contains("(interrupted)"));
    }
}
