//! Cross-crate integration tests: shac-format + shac-render.
//!
//! Exercises the full pipeline: encode positioned mono sources into
//! ambisonic layers, write a container, read it back, and verify the
//! bytes, metadata, and audio survive exactly.

use serde_json::json;

use shac_format::{
    parse, read_from_path, AmbisonicBuffer, LayerMetadata, Normalization, ShacWriter, HEADER_SIZE,
};
use shac_math::Vec3;
use shac_render::{encode_mono, EncoderOptions};

/// Helper: generate a short sine burst.
fn generate_sine(freq: f32, sample_rate: u32, count: usize) -> Vec<f32> {
    (0..count)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn test_trivial_file_header_bytes() {
    // The reference layout: L=1, 4 samples, 48 kHz, SN3D, one layer
    // encoding a unit impulse at +Z.
    let samples = [1.0, 0.0, 0.0, 0.0];
    let audio = encode_mono(
        &samples,
        Vec3::new(0.0, 0.0, 1.0),
        &EncoderOptions::new(1, Normalization::Sn3d),
    )
    .unwrap();

    let meta = LayerMetadata::new([0.0, 0.0, 1.0], "t");
    let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
    writer.add_layer("a", audio, &meta).unwrap();

    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();

    assert_eq!(
        &bytes[..HEADER_SIZE],
        &[
            0x53, 0x48, 0x41, 0x43, 0x01, 0x00, 0x01, 0x00, 0x04, 0x00, 0x80, 0xBB, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
        ]
    );

    // The encoded impulse frame is (W, Y, Z, X) = (1, 0, 1, 0).
    let file = parse(&bytes).unwrap();
    let frame = file.layers[0].audio.frame(0);
    assert!((frame[0] - 1.0).abs() < 1e-6);
    assert!(frame[1].abs() < 1e-6);
    assert!((frame[2] - 1.0).abs() < 1e-6);
    assert!(frame[3].abs() < 1e-6);
    assert!(file.layers[0].audio.frame(1).iter().all(|&s| s == 0.0));
}

#[test]
fn test_two_layer_round_trip_preserves_everything() {
    let sr = 48_000;
    let opts = EncoderOptions::new(2, Normalization::Sn3d);

    let meta_voice = LayerMetadata::new([0.0, 0.0, 2.0], "voice")
        .with_extra("language", json!("fi"))
        .with_extra("take", json!(3));
    let meta_piano = LayerMetadata::new([-1.5, 0.5, 1.0], "instrument").with_gain(0.7);

    let voice = encode_mono(
        &generate_sine(440.0, sr, 128),
        Vec3::new(0.0, 0.0, 2.0),
        &opts,
    )
    .unwrap();
    let piano = encode_mono(
        &generate_sine(220.0, sr, 128),
        Vec3::new(-1.5, 0.5, 1.0),
        &opts,
    )
    .unwrap();

    let mut writer = ShacWriter::new(2, sr, Normalization::Sn3d).unwrap();
    writer.add_layer("voice", voice.clone(), &meta_voice).unwrap();
    writer.add_layer("piano", piano.clone(), &meta_piano).unwrap();

    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();

    let file = parse(&bytes).unwrap();
    assert_eq!(file.header, *writer.header());
    assert_eq!(file.header.layer_count, 2);
    assert_eq!(file.layers[0].id, "voice");
    assert_eq!(file.layers[1].id, "piano");

    // Metadata survives field-for-field, unknown fields included.
    assert_eq!(file.layers[0].metadata, meta_voice);
    assert_eq!(file.layers[1].metadata, meta_piano);
    assert_eq!(file.layers[0].metadata.extra.get("language"), Some(&json!("fi")));

    // Audio survives bit-for-bit.
    assert_eq!(file.layers[0].audio, voice);
    assert_eq!(file.layers[1].audio, piano);

    // Writing the parsed model again reproduces the same bytes.
    let mut rewriter = ShacWriter::new(2, sr, Normalization::Sn3d).unwrap();
    for layer in &file.layers {
        rewriter
            .add_layer(&layer.id, layer.audio.clone(), &layer.metadata)
            .unwrap();
    }
    let mut bytes2 = Vec::new();
    rewriter.write(&mut bytes2).unwrap();
    assert_eq!(bytes, bytes2);
}

#[test]
fn test_container_length_identity() {
    // file_size = 26 + Σ (6 + id_len + meta_len + samples·N·4)
    let sr = 44_100;
    let opts = EncoderOptions::new(1, Normalization::N3d);
    let ids = ["one", "two", "three"];

    let mut writer = ShacWriter::new(1, sr, Normalization::N3d).unwrap();
    let mut expected = HEADER_SIZE;
    for (i, id) in ids.iter().enumerate() {
        let meta = LayerMetadata::new([i as f64, 0.0, 1.0], "t");
        let audio = encode_mono(
            &generate_sine(110.0, sr, 64),
            Vec3::new(i as f32, 0.0, 1.0),
            &opts,
        )
        .unwrap();
        let meta_len = serde_json::to_vec(&meta).unwrap().len();
        expected += 6 + id.len() + meta_len + 64 * 4 * 4;
        writer.add_layer(id, audio, &meta).unwrap();
    }

    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();
    assert_eq!(bytes.len(), expected);
}

#[test]
fn test_on_disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.shac");

    let opts = EncoderOptions::new(3, Normalization::Sn3d);
    let audio = encode_mono(
        &generate_sine(330.0, 48_000, 256),
        Vec3::new(1.0, 1.0, 1.0),
        &opts,
    )
    .unwrap();

    let mut writer = ShacWriter::new(3, 48_000, Normalization::Sn3d).unwrap();
    writer
        .add_layer("src", audio, &LayerMetadata::new([1.0, 1.0, 1.0], "t"))
        .unwrap();
    writer.write_to_path(&path).unwrap();

    let file = read_from_path(&path).unwrap();
    assert_eq!(file.header.order, 3);
    assert_eq!(file.header.channels, 16);
    assert_eq!(file.layers[0].audio.frames(), 256);
}

#[test]
fn test_corruption_is_detected_end_to_end() {
    let opts = EncoderOptions::new(1, Normalization::Sn3d);
    let audio = encode_mono(&[1.0; 16], Vec3::new(0.0, 0.0, 1.0), &opts).unwrap();
    let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
    writer
        .add_layer("a", audio, &LayerMetadata::new([0.0, 0.0, 1.0], "t"))
        .unwrap();
    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();

    let mut flipped = bytes.clone();
    flipped[0] = 0x54;
    assert!(parse(&flipped).is_err());

    assert!(parse(&bytes[..bytes.len() - 1]).is_err());
    assert!(parse(&bytes).is_ok());
}

#[test]
fn test_de_interleaved_channel_access() {
    let opts = EncoderOptions::new(1, Normalization::Sn3d);
    let mono = [1.0f32, -1.0, 0.5, -0.5];
    let audio = encode_mono(&mono, Vec3::new(0.0, 0.0, 1.0), &opts).unwrap();

    let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
    writer
        .add_layer("a", audio, &LayerMetadata::new([0.0, 0.0, 1.0], "t"))
        .unwrap();
    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();
    let file = parse(&bytes).unwrap();

    // For a front source the W and Z channels both carry the signal.
    let layer = &file.layers[0];
    let w = layer.audio.channel(0);
    let z = layer.audio.channel(2);
    for (i, &s) in mono.iter().enumerate() {
        assert!((w[i] - s).abs() < 1e-6);
        assert!((z[i] - s).abs() < 1e-6);
    }
    assert!(layer.audio.channel(1).iter().all(|&s| s.abs() < 1e-6));
}

#[test]
fn test_zero_signal_layer_round_trips_to_zeros() {
    let audio = AmbisonicBuffer::from_interleaved(vec![0.0; 32 * 4], 4).unwrap();
    let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
    writer
        .add_layer("silent", audio, &LayerMetadata::new([3.0, 0.0, 0.0], "t"))
        .unwrap();
    let mut bytes = Vec::new();
    writer.write(&mut bytes).unwrap();

    let file = parse(&bytes).unwrap();
    assert!(file.layers[0].audio.samples().iter().all(|&s| s == 0.0));
}
