use crate::capability::CapabilitySet;
use crate::codes::{self, EV_SYN};
use crate::event::{EventFrame, FieldUpdate, Timestamp};
use crate::sequence::Sequence;

/// Frames per stream are drawn from `[0, MAX_FRAMES)`.
pub const MAX_FRAMES: u32 = 200;
/// Field updates per frame are drawn from `[0, MAX_UPDATES)`.
pub const MAX_UPDATES: u32 = 12;
/// Non-binary values are drawn from `[0, VALUE_RANGE)`.
pub const VALUE_RANGE: u32 = 50;

/// Every `(category, code)` a stream may update: the negotiated
/// capabilities minus EV_SYN and the safety exclusions, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPool {
    entries: Vec<(u16, u16)>,
}

impl FieldPool {
    pub fn from_capabilities(caps: &CapabilitySet) -> Self {
        let entries = caps
            .iter()
            .filter(|&(type_, code, _)| type_ != EV_SYN && !codes::is_excluded(type_, code))
            .map(|(type_, code, _)| (type_, code))
            .collect();
        FieldPool { entries }
    }

    pub fn entries(&self) -> &[(u16, u16)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value for one update: `{0, 1}` for key-like and switch-like categories,
/// `[0, VALUE_RANGE)` for everything else.
#[inline]
pub fn sample_value(seq: &mut Sequence, type_: u16) -> i32 {
    let bound = if codes::is_binary(type_) { 2 } else { VALUE_RANGE };
    seq.next_below(bound) as i32
}

/// Produces the frames of one event stream.
///
/// The frame count is drawn on construction, unless the pool is empty, in
/// which case nothing is drawn and the stream has no frames.
#[derive(Debug)]
pub struct StreamSampler<'a> {
    seq: &'a mut Sequence,
    pool: &'a FieldPool,
    frame_count: u32,
    emitted: u32,
    last: Timestamp,
}

impl<'a> StreamSampler<'a> {
    pub fn new(seq: &'a mut Sequence, pool: &'a FieldPool, start: Timestamp) -> Self {
        let frame_count = if pool.is_empty() {
            0
        } else {
            seq.next_below(MAX_FRAMES)
        };
        StreamSampler {
            seq,
            pool,
            frame_count,
            emitted: 0,
            last: start,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Samples the next frame, stamped with `now`. Returns `None` once
    /// `frame_count` frames have been produced.
    pub fn next_frame(&mut self, now: Timestamp) -> Option<EventFrame> {
        if self.emitted >= self.frame_count {
            return None;
        }
        self.emitted += 1;

        let update_count = self.seq.next_below(MAX_UPDATES);
        let mut updates = Vec::with_capacity(update_count as usize + 1);
        for _ in 0..update_count {
            let idx = self.seq.next_below(self.pool.len() as u32) as usize;
            let (type_, code) = self.pool.entries[idx];
            let value = sample_value(self.seq, type_);
            updates.push(FieldUpdate { type_, code, value });
        }
        updates.push(FieldUpdate::SYN_REPORT);

        let delta_us = now.as_micros().saturating_sub(self.last.as_micros());
        self.last = now;

        Some(EventFrame {
            timestamp: now,
            delta_us,
            updates,
        })
    }
}
