//! Fuzz target for the SHAC container parser.
//!
//! Feeds arbitrary bytes to `parse` to find crashes, panics, and
//! pathological allocations.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(file) = shac_format::parse(data) {
        // A successfully parsed file must be internally consistent.
        assert_eq!(file.layers.len(), file.header.layer_count as usize);
        for layer in &file.layers {
            assert_eq!(layer.audio.frames(), file.header.samples as usize);
            assert_eq!(layer.audio.channels(), file.header.channels as usize);
            let _ = layer.audio.channel(0);
        }
    }
});
