use std::f64::consts::PI;

use tfscope::frame::FrameSpec;
use tfscope::mel::{hz_to_mel, mel_filterbank, mel_to_hz, to_mel};
use tfscope::stft::compute_stft;
use tfscope::Signal;

/// The Slaney scale is linear to 1 kHz and the conversions invert each other.
#[test]
fn scale_conversions() {
    assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
    assert!((hz_to_mel(500.0) - 7.5).abs() < 1e-9);
    for hz in [0.0, 300.0, 1000.0, 4321.0, 12_000.0] {
        assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
    }
}

/// The filterbank has one row per band and one column per bin, all weights non-negative.
#[test]
fn filterbank_shape() {
    let fb = mel_filterbank(16_000, 512, 40, 0.0, 8_000.0).expect("Invariant: operation should succeed");
    assert_eq!(fb.shape(), (40, 257));
    assert!(fb.as_slice().iter().all(|&w| w >= 0.0));
    for band in 0..40 {
        assert!(fb.row(band).iter().any(|&w| w > 0.0), "band {band} is empty");
    }
}

/// A 1 kHz tone lights the band centred nearest 1 kHz.
#[test]
fn tone_lands_in_matching_band() {
    let signal = Signal::from_fn(16_000, 16_000, |t| (2.0 * PI * 1000.0 * t).sin())
        .expect("Invariant: operation should succeed");
    let stft = compute_stft(&signal, &FrameSpec::new(1024, 256))
        .expect("Invariant: operation should succeed");
    let mel = to_mel(&stft, 40).expect("Invariant: operation should succeed");
    assert_eq!(mel.power.shape(), (40, stft.times.len()));
    assert_eq!(mel.frequencies.len(), 40);

    let mid = mel.times.len() / 2;
    let best = (0..40)
        .max_by(|&a, &b| mel.power[(a, mid)].total_cmp(&mel.power[(b, mid)]))
        .expect("Invariant: bands are non-empty");
    let centre = mel.frequencies[best];
    assert!((centre - 1000.0).abs() < 160.0, "peak band centred at {centre:.1} Hz");
}
