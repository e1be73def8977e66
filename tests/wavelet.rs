use std::f64::consts::PI;

use tfscope::wavelet::{compute_cwt, scale_to_frequency, ScaleSpec, WaveletKind};
use tfscope::{Error, Signal};

/// Frequency decreases strictly as scale grows, for every family.
#[test]
fn scale_to_frequency_is_monotone() {
    let scales = ScaleSpec::default()
        .resolve()
        .expect("Invariant: operation should succeed");
    assert_eq!(scales.len(), 256);
    assert_eq!(scales[0], 1.0);
    assert!(*scales.last().expect("Invariant: scales are non-empty") < 128.0);
    for wavelet in [
        WaveletKind::Morlet,
        WaveletKind::MexicanHat,
        WaveletKind::Gaussian { order: 4 },
        WaveletKind::ComplexMorlet {
            bandwidth: 1.5,
            center: 1.0,
        },
        WaveletKind::ComplexGaussian { order: 1 },
        WaveletKind::ComplexGaussian { order: 4 },
        WaveletKind::ComplexGaussian { order: 8 },
    ] {
        let freqs = scale_to_frequency(wavelet, &scales, 8_000);
        assert!(freqs.windows(2).all(|w| w[0] > w[1]), "{wavelet}");
    }
}

/// A 500 Hz tone concentrates its Morlet energy at the scale mapped to about 500 Hz.
#[test]
fn sinusoid_energy_at_matching_scale() {
    let sr = 8_000;
    let signal = Signal::from_fn(2000, sr, |t| (2.0 * PI * 500.0 * t).sin())
        .expect("Invariant: operation should succeed");
    let result = compute_cwt(&signal, &ScaleSpec::new(4.0, 40.0, 72), WaveletKind::Morlet)
        .expect("Invariant: operation should succeed");
    assert_eq!(result.coefficients.shape(), (72, 2000));
    assert_eq!(result.times.len(), 2000);
    assert!((result.times[8] - 0.001).abs() < 1e-12);

    let energy: Vec<f64> = (0..72)
        .map(|row| {
            (1000..1032)
                .map(|col| result.coefficients[(row, col)].norm())
                .fold(0.0, f64::max)
        })
        .collect();
    let best = energy
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .expect("Invariant: rows are non-empty");
    let hz = result.frequencies[best];
    assert!((hz - 500.0).abs() < 50.0, "peak at {hz:.1} Hz");
}

/// Real wavelets yield purely real coefficients; complex Morlet does not.
#[test]
fn imaginary_part_follows_wavelet() {
    let signal = Signal::from_fn(512, 8_000, |t| (2.0 * PI * 300.0 * t).cos())
        .expect("Invariant: operation should succeed");
    let scales = ScaleSpec::new(4.0, 20.0, 8);
    let real = compute_cwt(&signal, &scales, WaveletKind::MexicanHat)
        .expect("Invariant: operation should succeed");
    assert!(real.coefficients.as_slice().iter().all(|c| c.im == 0.0));
    let cmor = compute_cwt(
        &signal,
        &scales,
        WaveletKind::ComplexMorlet {
            bandwidth: 1.0,
            center: 1.0,
        },
    )
    .expect("Invariant: operation should succeed");
    assert!(cmor.coefficients.as_slice().iter().any(|c| c.im.abs() > 1e-6));
    let cgau = compute_cwt(&signal, &scales, WaveletKind::ComplexGaussian { order: 2 })
        .expect("Invariant: operation should succeed");
    assert!(cgau.coefficients.as_slice().iter().any(|c| c.im.abs() > 1e-6));
}

/// A 500 Hz tone peaks near 500 Hz under the complex Gaussian wavelet too.
#[test]
fn complex_gaussian_tone_peak() {
    let sr = 8_000;
    let signal = Signal::from_fn(2000, sr, |t| (2.0 * PI * 500.0 * t).sin())
        .expect("Invariant: operation should succeed");
    let result = compute_cwt(
        &signal,
        &ScaleSpec::new(2.0, 30.0, 112),
        WaveletKind::ComplexGaussian { order: 4 },
    )
    .expect("Invariant: operation should succeed");
    let best = (0..112)
        .map(|row| {
            (1000..1032)
                .map(|col| result.coefficients[(row, col)].norm())
                .fold(0.0, f64::max)
        })
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .expect("Invariant: rows are non-empty");
    let hz = result.frequencies[best];
    assert!((hz - 500.0).abs() < 100.0, "peak at {hz:.1} Hz");
    // the peak sits away from the ends of the scale range
    assert!(best > 5 && best < 106, "peak row {best}");
}

/// Names parse, unknown names fail and bad scale ranges are rejected.
#[test]
fn names_and_scale_validation() {
    assert_eq!(
        "cmor1.5-1.0".parse::<WaveletKind>().expect("Invariant: operation should succeed"),
        WaveletKind::ComplexMorlet {
            bandwidth: 1.5,
            center: 1.0
        }
    );
    assert_eq!(
        "gaus3".parse::<WaveletKind>().expect("Invariant: operation should succeed"),
        WaveletKind::Gaussian { order: 3 }
    );
    for order in 1..=8u8 {
        assert_eq!(
            format!("cgau{order}")
                .parse::<WaveletKind>()
                .expect("Invariant: cgau orders 1 to 8 parse"),
            WaveletKind::ComplexGaussian { order }
        );
    }
    assert!(matches!(
        "cgau9".parse::<WaveletKind>(),
        Err(Error::UnsupportedVariant { kind: "wavelet", .. })
    ));
    assert!(matches!(
        "haar".parse::<WaveletKind>(),
        Err(Error::UnsupportedVariant { kind: "wavelet", .. })
    ));
    assert!(ScaleSpec::new(0.0, 10.0, 4).resolve().is_err());
    assert!(ScaleSpec::new(10.0, 10.0, 4).resolve().is_err());
    assert!(ScaleSpec::new(1.0, 10.0, 0).resolve().is_err());
}
