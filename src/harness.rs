//! The outer loop: one sequence per run, one selector draw per iteration.
//!
//! Before each iteration a selector draw is taken from the sequence and
//! recorded with the iteration. Replaying means re-seeding, skipping draws
//! until the selector equals the recorded one (or, given its draw index,
//! skipping straight to that draw), and running exactly one iteration from
//! there.

use crate::backend::{Backend, CapabilityReader, HotplugMonitor, InputLibrary, VirtualDeviceDriver};
use crate::config::Config;
use crate::driver::{self, Iteration};
use crate::error::HarnessError;
use crate::event::Clock;
use crate::recorder::RunRecord;
use crate::sequence::Sequence;
use crate::stats::HarnessStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Runs iterations until the limit is reached or `stop` is set. `stop` is
/// only checked between iterations. `on_start` is called as each iteration
/// begins.
pub fn run<D, M, R, L, C>(
    backend: &mut Backend<D, M, R, L>,
    clock: &mut C,
    config: &Config,
    stop: &AtomicBool,
    mut on_start: impl FnMut(&Iteration),
) -> Result<HarnessStats, HarnessError>
where
    D: VirtualDeviceDriver,
    M: HotplugMonitor,
    R: CapabilityReader,
    L: InputLibrary,
    C: Clock,
{
    let started = Instant::now();
    let mut stats = HarnessStats::new(config.seed, config.replay);
    let mut seq = Sequence::new(config.seed);

    let mut random = seq.next();
    match (config.replay, config.replay_draw) {
        (Some(target), Some(draw)) => {
            if let Some(found) = seq.advance_to_draw(draw) {
                random = found;
            }
            if random != target {
                return Err(HarnessError::ReplayMismatch {
                    seed: config.seed,
                    draw,
                    expected: target,
                    found: random,
                });
            }
            info!(target, draw, "advanced to replayed iteration");
        }
        (Some(target), None) => {
            if random != target {
                let skipped = seq.fast_forward_to(target);
                info!(target, skipped, "advanced to replayed iteration");
            }
            random = target;
        }
        (None, _) => {}
    }

    let limit = config.iteration_limit();
    let mut index = 0;
    while index < limit {
        if stop.load(Ordering::Relaxed) {
            info!(completed = index, "stop requested");
            break;
        }

        let iteration = Iteration {
            index,
            name: config.device_name(index),
            record: RunRecord {
                seed: config.seed,
                random,
                draw: seq.draws(),
            },
        };
        on_start(&iteration);
        stats.last_device = Some(iteration.name.clone());
        stats.last_random = Some(random);
        debug!(
            name = %iteration.name,
            random,
            draw = iteration.record.draw,
            "starting iteration"
        );

        let report = driver::run_iteration(backend, &mut seq, clock, config, &iteration)?;
        stats.record(&report);

        index += 1;
        random = seq.next();
    }

    stats.finish(started.elapsed(), stop.load(Ordering::Relaxed));
    Ok(stats)
}
