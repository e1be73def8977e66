use tfscope::window::{hann, WindowKind};
use tfscope::Error;

/// Windows are periodic: a length-4 Hann is `[0, 0.5, 1, 0.5]`.
#[test]
fn hann_is_periodic() {
    let w = hann(4);
    for (got, want) in w.iter().zip([0.0, 0.5, 1.0, 0.5]) {
        assert!((got - want).abs() < 1e-12);
    }
}

/// Every window has the requested length and peaks near one.
#[test]
fn generated_lengths_and_peaks() {
    for name in ["hann", "hamming", "blackman", "bartlett", "rectangular", "kaiser:5", "tukey:0.25"] {
        let kind: WindowKind = name.parse().expect("Invariant: operation should succeed");
        let w = kind.generate(64);
        assert_eq!(w.len(), 64, "{name}");
        let peak = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((peak - 1.0).abs() < 1e-9, "{name}: {peak}");
        assert_eq!(kind.generate(1), vec![1.0], "{name}");
    }
}

/// Display and parsing agree, including parameters.
#[test]
fn names_round_trip() {
    let kind = WindowKind::Kaiser { beta: 6.5 };
    assert_eq!(kind.to_string().parse::<WindowKind>().expect("Invariant: operation should succeed"), kind);
    assert!(matches!(
        "flattop".parse::<WindowKind>(),
        Err(Error::UnsupportedVariant { kind: "window", .. })
    ));
}
