use crate::backend::UeventSource;
use crate::util;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub seed: u64,
    /// Iteration limit; `None` runs until interrupted.
    pub limit: Option<u64>,
    /// Selector draw to replay; implies a single iteration.
    pub replay: Option<u32>,
    /// Draw index of `replay`, when known.
    pub replay_draw: Option<u64>,
    pub log_dir: PathBuf,
    pub keep_logs: bool,
    pub poll_timeout: Duration,
    pub poll_backoff: Duration,
    pub uevent_source: UeventSource,
    pub name_prefix: String,
    pub stats_json: bool,
    pub verbose: bool,
    pub log_filter: String,
}

impl Config {
    /// Defaults for everything but the seed.
    pub fn with_seed(seed: u64) -> Self {
        Config {
            seed,
            limit: None,
            replay: None,
            replay_draw: None,
            log_dir: PathBuf::from("."),
            keep_logs: false,
            poll_timeout: Duration::from_secs(2),
            poll_backoff: Duration::from_millis(200),
            uevent_source: UeventSource::Udev,
            name_prefix: "fuzzydevice".to_string(),
            stats_json: false,
            verbose: false,
            log_filter: "fuzzy_device=info".to_string(),
        }
    }

    /// Number of iterations to run, `u64::MAX` meaning unbounded.
    pub fn iteration_limit(&self) -> u64 {
        if self.replay.is_some() {
            1
        } else {
            self.limit.unwrap_or(u64::MAX)
        }
    }

    pub fn device_name(&self, iteration: u64) -> String {
        format!("{}-{:06}", self.name_prefix, iteration)
    }
}

impl From<&crate::cli::Args> for Config {
    fn from(a: &crate::cli::Args) -> Self {
        Self {
            seed: a.seed.unwrap_or_else(util::unix_seconds),
            limit: a.limit,
            replay: a.random,
            replay_draw: a.draw,
            log_dir: a.log_dir.clone(),
            keep_logs: a.keep_logs,
            poll_timeout: a.poll_timeout,
            poll_backoff: a.poll_backoff,
            uevent_source: a.uevent_source,
            name_prefix: a.name_prefix.clone(),
            stats_json: a.stats_json,
            verbose: a.verbose,
            log_filter: a.log_filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_forces_a_single_iteration() {
        let mut cfg = Config::with_seed(1);
        assert_eq!(cfg.iteration_limit(), u64::MAX);
        cfg.limit = Some(5);
        assert_eq!(cfg.iteration_limit(), 5);
        cfg.replay = Some(42);
        assert_eq!(cfg.iteration_limit(), 1);
    }

    #[test]
    fn device_names_are_zero_padded() {
        let cfg = Config::with_seed(1);
        assert_eq!(cfg.device_name(7), "fuzzydevice-000007");
    }
}
