use crate::capability::{AbsInfo, CapabilitySet, DeviceDescription};
use crate::codes::{self, EV_ABS, EV_MAX, EV_REP};
use crate::sequence::Sequence;
use tracing::trace;

/// Upper bound (inclusive) on the number of capability bits one device asks for.
pub const MAX_BITS: u32 = 64;

/// Samples a random device description.
///
/// Draws `bit_count` in `[1, MAX_BITS]`, then fills that many bit slots with
/// a random category in `[1, EV_MAX]` and a random code within that
/// category. Draws landing on EV_REP, or on a category without enumerable
/// codes, are thrown away without using up a slot. Only EV_ABS codes carry
/// a value range.
pub fn sample_device(seq: &mut Sequence, name: &str) -> DeviceDescription {
    let bit_count = seq.next_below(MAX_BITS) + 1;
    let mut capabilities = CapabilitySet::new();
    let mut remaining = bit_count;

    while remaining > 0 {
        let type_ = seq.next_below(u32::from(EV_MAX)) as u16 + 1;
        if type_ == EV_REP {
            continue;
        }
        let Some(max) = codes::type_max(type_) else {
            continue;
        };
        let code = seq.next_below(u32::from(max) + 1) as u16;
        let abs = (type_ == EV_ABS).then_some(AbsInfo::SAMPLED);
        trace!(
            type_ = codes::type_name(type_),
            code = codes::code_name(type_, code),
            "enable bit"
        );
        capabilities.enable(type_, code, abs);
        remaining -= 1;
    }

    DeviceDescription {
        name: name.to_string(),
        requested_bits: bit_count,
        capabilities,
    }
}
