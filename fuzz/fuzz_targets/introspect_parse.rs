//! Fuzz target for introspection XML parsing.
//!
//! Ensures that malformed introspection documents don't cause panics.

#![no_main]

use dynbus::introspect::parse_introspection;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Should not panic on any XML input
        let _ = parse_introspection(s);
    }
});
