// fuzz/fuzz_targets/fuzz_stream_sampler.rs
#![no_main]

use arbitrary::Arbitrary;
use fuzzy_device::capability::CapabilitySet;
use fuzzy_device::codes;
use fuzzy_device::event::Timestamp;
use fuzzy_device::sampler::{FieldPool, StreamSampler};
use fuzzy_device::sequence::Sequence;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    seed: u64,
    bits: Vec<(u16, u16)>,
}

fuzz_target!(|input: Input| {
    let mut caps = CapabilitySet::new();
    for (type_, code) in input.bits.into_iter().take(256) {
        let type_ = type_ % (codes::EV_MAX + 1);
        if let Some(max) = codes::type_max(type_) {
            caps.enable(type_, code % (max + 1), None);
        }
    }
    let pool = FieldPool::from_capabilities(&caps);
    let mut seq = Sequence::new(input.seed);
    let mut sampler = StreamSampler::new(&mut seq, &pool, Timestamp::default());
    let mut t = 0;
    while let Some(frame) = sampler.next_frame(Timestamp::from_micros(t)) {
        t += 1;
        assert!(frame.updates.last().is_some_and(|u| u.is_sync_marker()));
        for u in frame.fields() {
            assert!(pool.entries().contains(&(u.type_, u.code)));
        }
    }
});
