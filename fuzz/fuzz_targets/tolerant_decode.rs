#![no_main]

use libfuzzer_sys::fuzz_target;
use tailscope::decode::decode_entry;
use tailscope::extract::extract_field_sets;
use tailscope::pauses::extract_pause_deltas;

fuzz_target!(|data: &[u8]| {
    // Arbitrary entry bytes must never panic the decoder or the extractors
    if let Ok(decoded) = decode_entry("fuzz/instrumentation.json", data) {
        let _ = extract_field_sets(decoded.value());
        let _ = extract_pause_deltas(decoded.value());
    }
});
