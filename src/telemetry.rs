//! Tracing initialization.

use crate::{config::Config, util};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber (fmt layer on stderr + env filter).
pub fn init_tracing(cfg: &Config) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(cfg.verbose)
        .with_level(true);

    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|e| {
        eprintln!("Warning: Invalid RUST_LOG '{}': {e}", cfg.log_filter);
        EnvFilter::new("fuzzy_device=info")
    });

    tracing_subscriber::registry().with(fmt_layer).with(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        build_ts = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        "fuzzy-device starting"
    );

    info!(seed = cfg.seed,
        limit = ?cfg.limit,
        replay = ?cfg.replay,
        log_dir = %cfg.log_dir.display(),
        keep_logs = cfg.keep_logs,
        poll_timeout = %util::format_duration(cfg.poll_timeout),
        poll_backoff = %util::format_duration(cfg.poll_backoff),
        uevent_source = ?cfg.uevent_source,
        name_prefix = %cfg.name_prefix,
        log_filter = %cfg.log_filter,
        "Configuration loaded");
}
