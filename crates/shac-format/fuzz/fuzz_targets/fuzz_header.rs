//! Fuzz target for SHAC header parsing.
//!
//! Prepends the SHAC magic bytes so inputs reach header validation
//! instead of dying on the magic check.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut input = vec![0x53, 0x48, 0x41, 0x43]; // "SHAC"
    input.extend_from_slice(data);

    // Must never panic, only return errors.
    let _ = shac_format::parse(&input);
});
