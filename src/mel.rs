//! Mel filterbank projection of STFT power (Slaney mel scale).

use crate::error::{Error, Result};
use crate::frame::FrameSpec;
use crate::matrix::Matrix;
use crate::transform::TransformResult;

/// Band count used when none is configured.
pub const DEFAULT_MEL_BANDS: usize = 128;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz to mel: linear below 1 kHz, logarithmic above.
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz < MIN_LOG_HZ {
        hz / F_SP
    } else {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    }
}

/// Inverse of [`hz_to_mel`].
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel < MIN_LOG_MEL {
        mel * F_SP
    } else {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    }
}

/// `count` frequencies evenly spaced on the mel scale between `fmin` and `fmax`.
pub fn mel_frequencies(count: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let lo = hz_to_mel(fmin);
    let hi = hz_to_mel(fmax);
    if count == 1 {
        return vec![fmin];
    }
    (0..count)
        .map(|i| mel_to_hz(lo + (hi - lo) * i as f64 / (count - 1) as f64))
        .collect()
}

/// Area-normalised triangular filters over one-sided FFT bins.
///
/// Returns an `n_mels x (fft_length / 2 + 1)` weight matrix.
pub fn mel_filterbank(
    sample_rate: u32,
    fft_length: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Result<Matrix<f64>> {
    if fft_length < 2 {
        return Err(Error::config("fft_length", "mel projection needs at least 2 points"));
    }
    let bins = FrameSpec::new(fft_length, 1).bin_frequencies(sample_rate);
    filterbank_for_bins(&bins, n_mels, fmin, fmax)
}

/// Mel filters evaluated at arbitrary bin frequencies.
pub fn filterbank_for_bins(
    bin_frequencies: &[f64],
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Result<Matrix<f64>> {
    if n_mels == 0 {
        return Err(Error::config("n_mels", "must be at least 1"));
    }
    if !(fmin >= 0.0 && fmin < fmax && fmax.is_finite()) {
        return Err(Error::config("fmax", "mel range must satisfy 0 <= fmin < fmax"));
    }
    let edges = mel_frequencies(n_mels + 2, fmin, fmax);
    let mut weights = Matrix::filled(n_mels, bin_frequencies.len(), 0.0);
    for band in 0..n_mels {
        let (lower, center, upper) = (edges[band], edges[band + 1], edges[band + 2]);
        let norm = 2.0 / (upper - lower);
        for (w, &f) in weights.row_mut(band).iter_mut().zip(bin_frequencies) {
            let rising = (f - lower) / (center - lower);
            let falling = (upper - f) / (upper - center);
            *w = rising.min(falling).max(0.0) * norm;
        }
    }
    Ok(weights)
}

/// Mel band power over time.
#[derive(Clone, Debug, PartialEq)]
pub struct MelSpectrogram {
    /// `n_mels x frames` band power.
    pub power: Matrix<f64>,
    /// Centre frequency of each band in Hz.
    pub frequencies: Vec<f64>,
    pub times: Vec<f64>,
}

/// Project STFT power onto `n_mels` bands spanning 0 Hz to the top of its frequency axis.
pub fn to_mel(stft: &TransformResult, n_mels: usize) -> Result<MelSpectrogram> {
    let bins = &stft.frequencies;
    if bins.len() < 2 {
        return Err(Error::DimensionMismatch {
            what: "stft frequency bins",
            expected: 2,
            got: bins.len(),
        });
    }
    let fmax = bins[bins.len() - 1];
    let weights = filterbank_for_bins(bins, n_mels, 0.0, fmax)?;
    let power = stft.coefficients.map(|c| c.norm_sqr());

    let frames = power.cols();
    let mut out = Matrix::filled(n_mels, frames, 0.0);
    for band in 0..n_mels {
        let w = weights.row(band);
        let row = out.row_mut(band);
        for (bin, &weight) in w.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            for (acc, &p) in row.iter_mut().zip(power.row(bin)) {
                *acc += weight * p;
            }
        }
    }
    let edges = mel_frequencies(n_mels + 2, 0.0, fmax);
    log::debug!("mel: {} bands up to {:.1} Hz over {} frames", n_mels, fmax, frames);
    Ok(MelSpectrogram {
        power: out,
        frequencies: edges[1..=n_mels].to_vec(),
        times: stft.times.clone(),
    })
}
