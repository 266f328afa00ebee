use crate::backend::UeventSource;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Creates virtual input devices with random capabilities, feeds them random
/// event streams and records everything needed to replay a run.
/// Must run as root.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Seed for the random sequence [default: current UNIX time].
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Stop after N iterations [default: run until interrupted].
    #[arg(long, value_name = "N")]
    pub limit: Option<u64>,

    /// Reproduce only the iteration whose random number (see the `# random:`
    /// line of its log) is N, then stop. Use together with that log's seed.
    #[arg(long, value_name = "N")]
    pub random: Option<u32>,

    /// With --random: take the random number from draw N (the `# draw:` line
    /// of the log) instead of searching for the first draw equal to it.
    #[arg(
        long,
        value_name = "N",
        requires = "random",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub draw: Option<u64>,

    /// Directory for the per-iteration `.evemu` and `.diag` logs.
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub log_dir: PathBuf,

    /// Keep the logs of iterations that completed normally.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub keep_logs: bool,

    /// How long one poll for the device's hotplug notification may block (e.g. "2s").
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub poll_timeout: Duration,

    /// Pause after a poll that timed out (e.g. "200ms").
    #[arg(long, default_value = "200ms", value_parser = humantime::parse_duration)]
    pub poll_backoff: Duration,

    /// Which netlink group to take hotplug notifications from.
    #[arg(long, value_enum, default_value_t = UeventSource::Udev)]
    pub uevent_source: UeventSource,

    /// Device names are `<PREFIX>-<iteration>`.
    #[arg(long, default_value = "fuzzydevice", value_name = "PREFIX")]
    pub name_prefix: String,

    /// Print the final run summary as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub stats_json: bool,

    /// Include module targets in log output.
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,

    /// Log filter directives (tracing-subscriber EnvFilter syntax).
    #[arg(long, env = "RUST_LOG", default_value = "fuzzy_device=info")]
    pub log_filter: String,
}

/// Parses command line arguments using clap.
pub fn parse_args() -> Args {
    Args::parse()
}
