use std::f64::consts::PI;

use tfscope::decibel::to_decibel;
use tfscope::frame::FrameSpec;
use tfscope::stft::compute_stft;
use tfscope::window::WindowKind;
use tfscope::{Error, Signal};

fn two_tone(sr: u32, seconds: f64) -> Signal {
    Signal::from_fn((seconds * sr as f64) as usize, sr, |t| {
        (2.0 * PI * 440.0 * t).sin() + (2.0 * PI * 880.0 * t).sin()
    })
    .expect("Invariant: operation should succeed")
}

/// Equal-amplitude tones peak at their nearest bins and dominate their surroundings.
#[test]
fn two_tone_peaks_at_expected_bins() {
    let signal = two_tone(48_000, 2.0);
    let stft = compute_stft(&signal, &FrameSpec::new(2048, 512))
        .expect("Invariant: operation should succeed");
    assert_eq!(stft.coefficients.rows(), 1025);
    assert_eq!(stft.frequencies.len(), 1025);

    let db = to_decibel(&stft.coefficients).expect("Invariant: operation should succeed");
    let mid = stft.times.len() / 2;
    let column: Vec<f64> = (0..86).map(|bin| db[(bin, mid)]).collect();
    let top = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    assert!(top - column[19] < 2.0, "440 Hz bin is {:.2} dB down", top - column[19]);
    assert!(top - column[38] < 2.0, "880 Hz bin is {:.2} dB down", top - column[38]);
    for (bin, &level) in column.iter().enumerate() {
        if bin.abs_diff(19) > 3 && bin.abs_diff(38) > 3 {
            assert!(top - level >= 10.0, "bin {bin} at {:.2} dB", level - top);
        }
    }
}

/// The 440 Hz and 880 Hz bins are local maxima in every column, edges included.
#[test]
fn tone_bins_are_local_maxima_in_every_column() {
    let signal = two_tone(48_000, 2.0);
    for (frame_length, hop_length, bins) in [(2048, 512, [19, 38]), (1024, 256, [9, 19])] {
        let stft = compute_stft(&signal, &FrameSpec::new(frame_length, hop_length))
            .expect("Invariant: operation should succeed");
        let db = to_decibel(&stft.coefficients).expect("Invariant: operation should succeed");
        assert!(db.cols() > 100);
        for col in 0..db.cols() {
            for k in bins {
                assert!(
                    db[(k, col)] >= db[(k - 1, col)] && db[(k, col)] >= db[(k + 1, col)],
                    "frame {frame_length}: bin {k} is not a peak in column {col}"
                );
            }
        }
    }
}

/// Axes follow the frame layout: `k * sr / fft_len` and `i * hop / sr`.
#[test]
fn axes_follow_frame_layout() {
    let signal = two_tone(8_000, 1.0);
    let spec = FrameSpec::new(256, 64).with_fft_length(512);
    let stft = compute_stft(&signal, &spec).expect("Invariant: operation should succeed");
    assert_eq!(stft.frequencies.len(), 257);
    assert!((stft.frequencies[1] - 15.625).abs() < 1e-12);
    assert_eq!(stft.frequencies[256], 4000.0);
    assert_eq!(stft.times.len(), spec.frame_count(signal.len()));
    assert!((stft.times[3] - 3.0 * 64.0 / 8000.0).abs() < 1e-12);
}

/// A signal shorter than a frame needs tail padding to yield any column.
#[test]
fn short_signal_without_padding_is_rejected() {
    let signal = Signal::new(vec![0.5; 100], 8_000).expect("Invariant: operation should succeed");
    let err = compute_stft(&signal, &FrameSpec::new(256, 64)).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidConfiguration {
            field: "frame_length",
            ..
        }
    ));

    let padded = compute_stft(&signal, &FrameSpec::new(256, 64).with_pad_tail(true))
        .expect("Invariant: operation should succeed");
    assert_eq!(padded.times.len(), 1);
}

/// A rectangular window on a bin-centred tone leaves no leakage.
#[test]
fn rectangular_window_bin_centred_tone() {
    let sr = 1024;
    let signal = Signal::from_fn(1024, sr, |t| (2.0 * PI * 64.0 * t).cos())
        .expect("Invariant: operation should succeed");
    let spec = FrameSpec::new(256, 256).with_window(WindowKind::Rectangular);
    let stft = compute_stft(&signal, &spec).expect("Invariant: operation should succeed");
    for col in 0..stft.times.len() {
        assert!((stft.coefficients[(16, col)].norm() - 128.0).abs() < 1e-9);
        assert!(stft.coefficients[(40, col)].norm() < 1e-9);
    }
}
