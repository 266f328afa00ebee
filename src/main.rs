// Main application entry point.
// Parses arguments, checks privileges, wires the Linux backends into the
// harness loop and prints the final summary.

use colored::*;
use fuzzy_device::backend::{Backend, EvdevReader, UeventMonitor, UinputDriver};
use fuzzy_device::config::Config;
use fuzzy_device::event::MonotonicClock;
use fuzzy_device::{cli, harness, telemetry};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use std::io::{self, Write};
use std::process::exit;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, warn};

/// Exit status telling test runners the program was skipped.
const EXIT_SKIP: i32 = 77;

fn main() {
    let args = cli::parse_args();

    // SAFETY: geteuid has no failure mode.
    if unsafe { libc::geteuid() } != 0 {
        eprintln!(
            "{}",
            "fuzzy-device must be run as root (needs /dev/uinput).".yellow().bold()
        );
        exit(EXIT_SKIP);
    }

    let cfg = Config::from(&args);
    telemetry::init_tracing(&cfg);

    let stop = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(sig, Arc::clone(&stop)) {
            warn!(signal = sig, error = %e, "failed to install signal handler");
        }
    }

    let monitor = match UeventMonitor::open(cfg.uevent_source) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{} {}", "Failed to open hotplug monitor:".red().bold(), e);
            exit(1);
        }
    };
    #[cfg(feature = "libinput")]
    let library = fuzzy_device::backend::LibinputLibrary;
    #[cfg(not(feature = "libinput"))]
    let library = fuzzy_device::backend::EvdevLibrary;
    let mut backend = Backend {
        driver: UinputDriver::new(),
        monitor,
        reader: EvdevReader,
        library,
    };

    match (cfg.replay, cfg.replay_draw) {
        (Some(random), Some(draw)) => {
            eprintln!("{} {} (draw {})", "Advancing to random number".dimmed(), random, draw);
        }
        (Some(random), None) => {
            eprintln!("{} {}", "Advancing to random number".dimmed(), random);
        }
        (None, _) => {}
    }

    let result = harness::run(&mut backend, &mut MonotonicClock, &cfg, &stop, |it| {
        print!(
            "\r{} {} (seed {} random {:>10})",
            "Testing".bold(),
            it.name,
            it.record.seed,
            it.record.random
        );
        let _ = io::stdout().flush();
    });
    println!();

    match result {
        Ok(stats) => {
            let printed = if cfg.stats_json {
                stats.print_json(io::stdout())
            } else {
                stats.print_human(io::stderr())
            };
            if let Err(e) = printed {
                warn!(error = %e, "failed to print summary");
            }
        }
        Err(e) => {
            error!(error = %e, "iteration failed");
            eprintln!("{} {}", "Fatal:".red().bold(), e);
            eprintln!(
                "{}",
                "The logs of the failing iteration were kept; \
                 replay with its seed and random number."
                    .yellow()
            );
            exit(1);
        }
    }
}
