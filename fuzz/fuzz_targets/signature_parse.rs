//! Fuzz target for type signature parsing.
//!
//! Ensures that arbitrary signature strings never cause panics, and that
//! an accepted signature round-trips through its wire form.

#![no_main]

use dynbus::TypeSignature;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(sig) = TypeSignature::parse(s) {
            // The wire form is canonical: it must equal the accepted input
            // and parse back to the same type.
            assert_eq!(sig.wire_str(), s);
            assert_eq!(TypeSignature::parse(&sig.wire_str()).unwrap(), sig);
        }
    }
});
