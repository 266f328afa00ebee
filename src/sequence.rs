//! The deterministic sequence every sampling decision draws from.
//!
//! A run is reproducible because nothing else in the crate keeps its own
//! randomness: re-seeding and drawing the same number of values in the same
//! order puts the generator back in the exact same state.

/// Seeded pseudo-random sequence with a draw counter.
#[derive(Debug)]
pub struct Sequence {
    seed: u64,
    rng: fastrand::Rng,
    draws: u64,
}

impl Sequence {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Sequence {
            seed,
            rng: fastrand::Rng::with_seed(seed),
            draws: 0,
        }
    }

    /// Returns the next value and advances the state exactly once.
    #[inline]
    pub fn next(&mut self) -> u32 {
        self.draws += 1;
        self.rng.u32(..)
    }

    /// `next() % bound`. Panics if `bound` is zero.
    #[inline]
    pub fn next_below(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0, "next_below called with a zero bound");
        self.next() % bound
    }

    /// Discards draws until one equals `target`. The matching draw is
    /// consumed too. Returns the number of draws that did not match.
    pub fn fast_forward_to(&mut self, target: u32) -> u64 {
        let mut skipped = 0;
        while self.next() != target {
            skipped += 1;
        }
        skipped
    }

    /// Discards draws until the next one is draw number `draw` (1-based),
    /// then takes and returns it. Returns `None`, drawing nothing, if that
    /// draw has already been taken.
    pub fn advance_to_draw(&mut self, draw: u64) -> Option<u32> {
        if draw <= self.draws {
            return None;
        }
        while self.draws + 1 < draw {
            self.next();
        }
        Some(self.next())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn since seeding.
    pub fn draws(&self) -> u64 {
        self.draws
    }
}
