//! Fuzz target for write → parse round-trips.
//!
//! Derives valid writer parameters from the fuzz input, writes a
//! container, reads it back, and verifies consistency.

#![no_main]

use libfuzzer_sys::fuzz_target;

use shac_format::{AmbisonicBuffer, LayerMetadata, Normalization, ShacWriter};
use shac_math::channel_count;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let order = (data[0] % 7) + 1;
    let layer_total = (data[1] % 4) as usize + 1;
    let frames = (data[2] % 32) as usize + 1;
    let sample_rate = match data[3] % 3 {
        0 => 8_000,
        1 => 48_000,
        _ => 192_000,
    };
    let normalization = if data[4] % 2 == 0 {
        Normalization::Sn3d
    } else {
        Normalization::N3d
    };

    let n = channel_count(order as u16);
    let mut writer = match ShacWriter::new(order as u16, sample_rate, normalization) {
        Ok(w) => w,
        Err(_) => return,
    };

    for i in 0..layer_total {
        let samples: Vec<f32> = (0..frames * n)
            .map(|j| data[(5 + i + j) % data.len()] as f32 / 255.0)
            .collect();
        let audio = AmbisonicBuffer::from_interleaved(samples, n).unwrap();
        let meta = LayerMetadata::new([i as f64, 0.0, 1.0], "fuzz");
        if writer.add_layer(&format!("layer_{i}"), audio, &meta).is_err() {
            return;
        }
    }

    let mut bytes = Vec::new();
    if writer.write(&mut bytes).is_err() {
        return;
    }

    let file = shac_format::parse(&bytes).expect("round-trip parse failed");
    assert_eq!(file.header.order, order as u16);
    assert_eq!(file.header.sample_rate, sample_rate);
    assert_eq!(file.header.layer_count as usize, layer_total);
    assert_eq!(file.header.samples as usize, frames);
});
