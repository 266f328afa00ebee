//! Device capability descriptions: what a sampled device asks for, and what
//! the kernel reports back once the device exists.

use crate::codes::{self, EV_ABS};
use std::collections::BTreeMap;

/// Absolute axis metadata, mirroring the kernel's `input_absinfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AbsInfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

impl AbsInfo {
    /// Range attached to every sampled EV_ABS code.
    pub const SAMPLED: AbsInfo = AbsInfo {
        value: 0,
        minimum: 0,
        maximum: 100,
        fuzz: 0,
        flat: 0,
        resolution: 0,
    };
}

/// Ordered set of `(category, code)` pairs. EV_ABS entries carry an
/// [`AbsInfo`]; every other category carries `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: BTreeMap<(u16, u16), Option<AbsInfo>>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables a code. Enabling an existing code replaces its metadata.
    pub fn enable(&mut self, type_: u16, code: u16, abs: Option<AbsInfo>) {
        let abs = if type_ == EV_ABS {
            Some(abs.unwrap_or(AbsInfo::SAMPLED))
        } else {
            None
        };
        self.entries.insert((type_, code), abs);
    }

    pub fn has_code(&self, type_: u16, code: u16) -> bool {
        self.entries.contains_key(&(type_, code))
    }

    pub fn has_type(&self, type_: u16) -> bool {
        self.entries
            .range((type_, 0)..=(type_, u16::MAX))
            .next()
            .is_some()
    }

    pub fn abs_info(&self, code: u16) -> Option<AbsInfo> {
        self.entries.get(&(EV_ABS, code)).copied().flatten()
    }

    /// Distinct categories, ascending.
    pub fn types(&self) -> Vec<u16> {
        let mut types: Vec<u16> = self.entries.keys().map(|&(t, _)| t).collect();
        types.dedup();
        types
    }

    /// Codes of one category, ascending.
    pub fn codes(&self, type_: u16) -> impl Iterator<Item = (u16, Option<AbsInfo>)> + '_ {
        self.entries
            .range((type_, 0)..=(type_, u16::MAX))
            .map(|(&(_, code), &abs)| (code, abs))
    }

    /// All entries in ascending `(category, code)` order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16, Option<AbsInfo>)> + '_ {
        self.entries.iter().map(|(&(t, c), &abs)| (t, c, abs))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kernel-style bitmask of the codes enabled for `type_`, sized to hold
    /// every code up to the category maximum.
    pub fn code_bitmask(&self, type_: u16) -> Vec<u8> {
        let max = codes::type_max(type_).unwrap_or(0) as usize;
        let mut mask = vec![0u8; max / 8 + 1];
        for (code, _) in self.codes(type_) {
            let code = code as usize;
            if code / 8 < mask.len() {
                mask[code / 8] |= 1 << (code % 8);
            }
        }
        mask
    }
}

/// A device to be created: a name plus the capabilities it requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescription {
    pub name: String,
    /// Number of bit slots the sampler filled. Duplicate draws share a slot
    /// in `capabilities`, so this can exceed `capabilities.len()`.
    pub requested_bits: u32,
    pub capabilities: CapabilitySet,
}

/// Bus/vendor/product/version as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceId {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// What a realized device negotiated, read back from its device node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceSnapshot {
    pub name: String,
    pub id: DeviceId,
    pub properties: Vec<u8>,
    pub capabilities: CapabilitySet,
    /// Categories whose type bit is set but which have no code bitmap to
    /// read (EV_REP, EV_PWR, EV_FF_STATUS, ...).
    pub bare_types: Vec<u16>,
}

impl DeviceSnapshot {
    /// Every category the device reports, with or without codes, ascending.
    pub fn types(&self) -> Vec<u16> {
        let mut types = self.capabilities.types();
        types.extend_from_slice(&self.bare_types);
        types.sort_unstable();
        types.dedup();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{EV_KEY, EV_REL};

    #[test]
    fn duplicate_enables_collapse() {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_KEY, 30, None);
        caps.enable(EV_KEY, 30, None);
        caps.enable(EV_REL, 0, None);
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.types(), vec![EV_KEY, EV_REL]);
    }

    #[test]
    fn abs_codes_always_carry_a_range() {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_ABS, 0, None);
        caps.enable(EV_KEY, 1, Some(AbsInfo::SAMPLED));
        assert_eq!(caps.abs_info(0), Some(AbsInfo::SAMPLED));
        assert_eq!(caps.iter().find(|e| e.0 == EV_KEY).unwrap().2, None);
    }

    #[test]
    fn ranges_are_scoped_to_one_type() {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_KEY, 0x2ff, None);
        caps.enable(EV_REL, 0, None);
        assert!(caps.has_type(EV_KEY));
        assert!(!caps.has_type(EV_ABS));
        assert_eq!(caps.codes(EV_KEY).count(), 1);
        assert!(caps.has_code(EV_REL, 0));
    }

    #[test]
    fn snapshot_types_include_bare_categories() {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_REL, 0, None);
        let snap = DeviceSnapshot {
            capabilities: caps,
            bare_types: vec![codes::EV_REP],
            ..DeviceSnapshot::default()
        };
        assert_eq!(snap.types(), vec![EV_REL, codes::EV_REP]);
    }

    #[test]
    fn bitmask_sets_the_right_bits() {
        let mut caps = CapabilitySet::new();
        caps.enable(EV_REL, 0, None);
        caps.enable(EV_REL, 9, None);
        assert_eq!(caps.code_bitmask(EV_REL), vec![0x01, 0x02]);
        assert_eq!(caps.code_bitmask(EV_KEY).len(), 96);
    }
}
