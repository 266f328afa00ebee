// fuzz/fuzz_targets/fuzz_event_log_parser.rs
#![no_main]

use fuzzy_device::recorder::{self, EventLog};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = recorder::parse_run_record(text);
    for line in text.lines() {
        // Anything that parses must survive being written and parsed again.
        if let Some(ev) = recorder::parse_event_line(line) {
            if ev.timestamp.usec >= 1_000_000 {
                continue;
            }
            let mut log = EventLog::new(Vec::new());
            log.write_update(ev.timestamp, &ev.update).unwrap();
            let written = String::from_utf8(log.into_inner()).unwrap();
            let again = recorder::parse_event_line(written.trim_end()).unwrap();
            assert_eq!(again, ev);
        }
    }
});
