// fuzz/fuzz_targets/fuzz_uevent_parser.rs
#![no_main]

use fuzzy_device::backend::uevent::parse_uevent;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(ev) = parse_uevent(data) {
        if let Some(node) = ev.devnode {
            assert!(node.is_absolute());
        }
    }
});
