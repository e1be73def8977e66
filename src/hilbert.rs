//! Hilbert transform and envelope demodulation.
//!
//! The analytic signal is built in the frequency domain for any input length:
//! positive frequencies are doubled, negative frequencies zeroed, DC (and the
//! Nyquist bin for even lengths) kept as is.

use num_complex::Complex64;
use rustfft::FftPlanner;

use crate::error::{Error, Result};
use crate::signal::Signal;

/// Compute the analytic signal `x + j * H{x}` of a real input.
pub fn analytic_signal(input: &[f64]) -> Result<Vec<Complex64>> {
    if input.is_empty() {
        return Err(Error::EmptyInput);
    }
    let n = input.len();
    let mut planner = FftPlanner::<f64>::new();
    let mut freq: Vec<Complex64> = input.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut freq);

    // bins 1..=(n-1)/2 are strictly positive; for even n the bin n/2 is Nyquist
    let positive_end = n.div_ceil(2);
    for f in freq.iter_mut().take(positive_end).skip(1) {
        *f *= 2.0;
    }
    let negative_start = n / 2 + 1;
    for f in freq.iter_mut().skip(negative_start) {
        *f = Complex64::new(0.0, 0.0);
    }

    planner.plan_fft_inverse(n).process(&mut freq);
    let scale = 1.0 / n as f64;
    for f in freq.iter_mut() {
        *f *= scale;
    }
    Ok(freq)
}

/// Instantaneous amplitude `|analytic(x)|`, never negative.
pub fn amplitude_envelope(input: &[f64]) -> Result<Vec<f64>> {
    Ok(analytic_signal(input)?.iter().map(|c| c.norm()).collect())
}

/// Amplitude envelope with its mean removed.
pub fn envelope(input: &[f64]) -> Result<Vec<f64>> {
    let mut env = amplitude_envelope(input)?;
    let mean = env.iter().sum::<f64>() / env.len() as f64;
    for v in env.iter_mut() {
        *v -= mean;
    }
    Ok(env)
}

/// Demodulate an amplitude-modulated signal into its zero-mean envelope.
pub fn demodulate_envelope(signal: &Signal) -> Result<Signal> {
    log::debug!("demodulating {} samples via Hilbert envelope", signal.len());
    signal.derive(envelope(signal.samples())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hilbert_analytic() {
        let x = [1.0, 0.0, -1.0, 0.0];
        let analytic = analytic_signal(&x).unwrap();
        assert_eq!(analytic.len(), x.len());
        // cos -> cos + j sin
        let expected_im = [0.0, 1.0, 0.0, -1.0];
        for (c, (&re, &im)) in analytic.iter().zip(x.iter().zip(expected_im.iter())) {
            assert!((c.re - re).abs() < 1e-12);
            assert!((c.im - im).abs() < 1e-12);
        }
    }

    #[test]
    fn odd_lengths_are_supported() {
        let x: Vec<f64> = (0..7).map(|i| (i as f64 * 0.9).sin()).collect();
        let analytic = analytic_signal(&x).unwrap();
        for (orig, c) in x.iter().zip(analytic.iter()) {
            assert!((orig - c.re).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hilbert_errors() {
        assert!(matches!(analytic_signal(&[]), Err(Error::EmptyInput)));
        assert!(matches!(envelope(&[]), Err(Error::EmptyInput)));
    }
}
