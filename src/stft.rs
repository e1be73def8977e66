//! Short-Time Fourier Transform over framed, windowed signals.

use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{Error, Result};
use crate::frame::FrameSpec;
use crate::matrix::Matrix;
use crate::progress::{RunControl, Stage};
use crate::signal::Signal;
use crate::transform::TransformResult;

/// Compute the one-sided STFT of `signal`.
///
/// Frame `i` starts at sample `i * hop_length`, is multiplied by the periodic
/// window, zero-padded to the FFT length and transformed. The result has
/// `fft_len / 2 + 1` rows (frequency `k * sr / fft_len`) and one column per
/// frame (time `i * hop / sr`).
pub fn compute_stft(signal: &Signal, spec: &FrameSpec) -> Result<TransformResult> {
    compute_stft_with(signal, spec, &RunControl::default())
}

/// [`compute_stft`] with progress reporting and cancellation.
pub fn compute_stft_with(
    signal: &Signal,
    spec: &FrameSpec,
    control: &RunControl,
) -> Result<TransformResult> {
    spec.validate()?;
    let frames = spec.frame_count(signal.len());
    if frames == 0 {
        return Err(Error::config(
            "frame_length",
            format!(
                "frame of {} samples is longer than the {}-sample signal; enable pad_tail or shorten the frame",
                spec.frame_length,
                signal.len()
            ),
        ));
    }
    log::debug!(
        "stft: {} frames, frame {} hop {} fft {} window {}",
        frames,
        spec.frame_length,
        spec.hop_length,
        spec.fft_len(),
        spec.window
    );

    let window = spec.window.generate(spec.frame_length);
    let fft = FftPlanner::<f64>::new().plan_fft_forward(spec.fft_len());
    let columns = frame_spectra(signal.samples(), spec, &window, &fft, frames, control)?;
    let coefficients = Matrix::from_columns(columns)?;

    TransformResult::new(
        coefficients,
        spec.bin_frequencies(signal.sample_rate()),
        spec.frame_times(frames, signal.sample_rate()),
    )
}

fn frame_spectrum(
    samples: &[f64],
    spec: &FrameSpec,
    window: &[f64],
    fft: &Arc<dyn Fft<f64>>,
    index: usize,
) -> Vec<Complex64> {
    let mut buf = vec![Complex64::new(0.0, 0.0); spec.fft_len()];
    spec.fill_frame(samples, index, window, &mut buf);
    fft.process(&mut buf);
    buf.truncate(spec.bins());
    buf
}

#[cfg(not(feature = "parallel"))]
fn frame_spectra(
    samples: &[f64],
    spec: &FrameSpec,
    window: &[f64],
    fft: &Arc<dyn Fft<f64>>,
    frames: usize,
    control: &RunControl,
) -> Result<Vec<Vec<Complex64>>> {
    let mut columns = Vec::with_capacity(frames);
    for index in 0..frames {
        control.checkpoint()?;
        columns.push(frame_spectrum(samples, spec, window, fft, index));
        control.report(Stage::Stft, index + 1, frames);
    }
    Ok(columns)
}

#[cfg(feature = "parallel")]
fn frame_spectra(
    samples: &[f64],
    spec: &FrameSpec,
    window: &[f64],
    fft: &Arc<dyn Fft<f64>>,
    frames: usize,
    control: &RunControl,
) -> Result<Vec<Vec<Complex64>>> {
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let done = AtomicUsize::new(0);
    (0..frames)
        .into_par_iter()
        .map(|index| {
            control.checkpoint()?;
            let column = frame_spectrum(samples, spec, window, fft, index);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            control.report(Stage::Stft, finished, frames);
            Ok(column)
        })
        .collect()
}
