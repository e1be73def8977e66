use std::f64::consts::PI;

use tfscope::pitch::{analyze_pitch, describe_range, PitchSpec};
use tfscope::{Advisory, Signal};

fn sine(hz: f64, sr: u32, seconds: f64) -> Signal {
    Signal::from_fn((sr as f64 * seconds) as usize, sr, |t| (2.0 * PI * hz * t).sin())
        .expect("Invariant: operation should succeed")
}

/// A steady 220 Hz tone is voiced throughout with a 220 Hz median.
#[test]
fn steady_tone_pitch() {
    let out = analyze_pitch(&sine(220.0, 8_000, 1.0), &PitchSpec::default())
        .expect("Invariant: operation should succeed");
    assert!(!out.is_warning());
    let summary = out.into_value();
    let stats = summary.stats.expect("Invariant: tone is voiced");
    assert!((stats.median - 220.0).abs() < 1.0, "median {}", stats.median);
    assert!(stats.min <= stats.median && stats.median <= stats.max);
    assert!((summary.voiced_percentage - 100.0).abs() < 1e-9);
    assert_eq!(summary.track.len(), summary.times.len());
}

/// Silence carries no pitch and says so.
#[test]
fn silence_has_no_pitch() {
    let silent = Signal::new(vec![0.0; 8_000], 8_000).expect("Invariant: operation should succeed");
    let out = analyze_pitch(&silent, &PitchSpec::default())
        .expect("Invariant: operation should succeed");
    assert_eq!(out.advisory(), Some(&Advisory::NoPitchDetected));
    let summary = out.into_value();
    assert!(summary.stats.is_none());
    assert_eq!(summary.voiced_percentage, 0.0);
}

/// Short frames are enlarged to hold two periods of `fmin`.
#[test]
fn short_frame_is_enlarged() {
    let spec = PitchSpec {
        frame_length: 256,
        hop_length: 64,
        ..PitchSpec::default()
    };
    let out = analyze_pitch(&sine(220.0, 8_000, 1.0), &spec)
        .expect("Invariant: operation should succeed");
    assert_eq!(
        out.advisory(),
        Some(&Advisory::FrameEnlarged {
            frame_length: 322,
            hop_length: 80
        })
    );
    let summary = out.into_value();
    assert_eq!(summary.frame_length, 322);
    assert!((summary.stats.expect("Invariant: tone is voiced").median - 220.0).abs() < 1.0);
}

/// Invalid search ranges are rejected up front.
#[test]
fn invalid_ranges() {
    let signal = sine(220.0, 8_000, 0.5);
    let inverted = PitchSpec {
        fmin: 500.0,
        fmax: 100.0,
        ..PitchSpec::default()
    };
    assert!(analyze_pitch(&signal, &inverted).is_err());
    let threshold = PitchSpec {
        threshold: 1.5,
        ..PitchSpec::default()
    };
    assert!(analyze_pitch(&signal, &threshold).is_err());
}

/// The range description names the register the tone falls in.
#[test]
fn range_description_is_not_empty() {
    assert!(describe_range(200.0, 240.0).contains("bass"));
    assert!(describe_range(40.0, 60.0).contains("sub-bass"));
}

/// Silence analysed with a short frame reports no pitch yet keeps the enlargement visible.
#[test]
fn enlargement_survives_no_pitch_advisory() {
    let silent = Signal::new(vec![0.0; 8_000], 8_000).expect("Invariant: operation should succeed");
    let spec = PitchSpec {
        frame_length: 256,
        hop_length: 64,
        ..PitchSpec::default()
    };
    let out = analyze_pitch(&silent, &spec).expect("Invariant: operation should succeed");
    assert_eq!(out.advisory(), Some(&Advisory::NoPitchDetected));
    let summary = out.into_value();
    assert_eq!(summary.requested_frame_length, 256);
    assert_eq!(summary.frame_length, 322);
    assert_eq!(
        summary.frame_enlarged(),
        Some(Advisory::FrameEnlarged {
            frame_length: 322,
            hop_length: 80
        })
    );
}
