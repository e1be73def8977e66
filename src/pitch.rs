//! Fundamental-frequency statistics using the YIN estimator.
//!
//! Frames are first enlarged with [`FrameSpec::fit_for_periodicity`] so each
//! one holds at least two periods of the lowest searched frequency.

use crate::error::{Advisory, Error, Outcome, Result};
use crate::frame::FrameSpec;
use crate::progress::{RunControl, Stage};
use crate::signal::Signal;

/// Pitch search configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PitchSpec {
    /// Lowest detectable F0 in Hz.
    pub fmin: f64,
    /// Highest detectable F0 in Hz.
    pub fmax: f64,
    pub frame_length: usize,
    pub hop_length: usize,
    /// Cumulative-mean-normalised difference below which a dip counts as periodic.
    pub threshold: f64,
}

impl Default for PitchSpec {
    fn default() -> Self {
        Self {
            fmin: 50.0,
            fmax: 2000.0,
            frame_length: 2048,
            hop_length: 512,
            threshold: 0.1,
        }
    }
}

impl PitchSpec {
    pub fn validate(&self) -> Result<()> {
        if !(self.fmin.is_finite() && self.fmin > 0.0) {
            return Err(Error::config("fmin", "must be a positive frequency"));
        }
        if !(self.fmax.is_finite() && self.fmax > self.fmin) {
            return Err(Error::config("fmax", "must exceed fmin"));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(Error::config("threshold", "must lie in (0, 1)"));
        }
        FrameSpec::new(self.frame_length, self.hop_length).validate()
    }
}

/// Aggregate statistics over voiced frames.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
}

/// Per-frame F0 track and its statistics.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchSummary {
    /// Estimated F0 per frame, `None` where unvoiced.
    pub track: Vec<Option<f64>>,
    /// Frame start times in seconds.
    pub times: Vec<f64>,
    /// `None` when no frame was voiced.
    pub stats: Option<PitchStats>,
    /// Share of voiced frames in percent.
    pub voiced_percentage: f64,
    /// Frame length actually analysed, after any enlargement.
    pub frame_length: usize,
    pub hop_length: usize,
    /// Frame length asked for in [`PitchSpec`].
    pub requested_frame_length: usize,
}

impl PitchSummary {
    pub fn voiced(&self) -> impl Iterator<Item = f64> + '_ {
        self.track.iter().filter_map(|f| *f)
    }

    /// The enlargement applied to the requested frame, if any.
    ///
    /// Still available when the returned outcome carries
    /// [`Advisory::NoPitchDetected`] instead.
    pub fn frame_enlarged(&self) -> Option<Advisory> {
        (self.frame_length != self.requested_frame_length).then_some(Advisory::FrameEnlarged {
            frame_length: self.frame_length,
            hop_length: self.hop_length,
        })
    }
}

/// Estimate the fundamental frequency of every frame and summarise it.
///
/// Returns [`Advisory::FrameEnlarged`] when the frame had to grow and
/// [`Advisory::NoPitchDetected`] (with empty statistics) when no frame is
/// voiced. When both apply the outcome carries `NoPitchDetected` and the
/// enlargement stays readable through [`PitchSummary::frame_enlarged`].
pub fn analyze_pitch(signal: &Signal, spec: &PitchSpec) -> Result<Outcome<PitchSummary>> {
    analyze_pitch_with(signal, spec, &RunControl::default())
}

/// [`analyze_pitch`] with progress reporting and cancellation.
pub fn analyze_pitch_with(
    signal: &Signal,
    spec: &PitchSpec,
    control: &RunControl,
) -> Result<Outcome<PitchSummary>> {
    spec.validate()?;
    let base = FrameSpec::new(spec.frame_length, spec.hop_length);
    let (frames, enlarged) = base
        .fit_for_periodicity(signal.sample_rate(), spec.fmin)?
        .into_parts();

    let count = frames.frame_count(signal.len());
    if count == 0 {
        return Err(Error::config(
            "frame_length",
            format!(
                "signal of {} samples is shorter than one {}-sample pitch frame",
                signal.len(),
                frames.frame_length
            ),
        ));
    }

    let sr = signal.sample_rate() as f64;
    let tau_max = ((sr / spec.fmin).ceil() as usize).min(frames.frame_length / 2);
    let tau_min = ((sr / spec.fmax).floor() as usize).max(2);
    if tau_min >= tau_max {
        return Err(Error::config(
            "fmax",
            "search range collapses to fewer than two lags at this sample rate",
        ));
    }

    let mut frame = vec![0.0; frames.frame_length];
    let mut track = Vec::with_capacity(count);
    for index in 0..count {
        control.checkpoint()?;
        for (slot, v) in frame
            .iter_mut()
            .zip(frames.frame_samples(signal.samples(), index))
        {
            *slot = v;
        }
        let f0 = yin(&frame, tau_min, tau_max, spec.threshold)
            .map(|tau| sr / tau)
            .filter(|f| (spec.fmin..=spec.fmax).contains(f));
        track.push(f0);
        control.report(Stage::Pitch, index + 1, count);
    }

    let voiced: Vec<f64> = track.iter().filter_map(|f| *f).collect();
    let summary = PitchSummary {
        times: frames.frame_times(count, signal.sample_rate()),
        stats: stats(&voiced),
        voiced_percentage: 100.0 * voiced.len() as f64 / count as f64,
        frame_length: frames.frame_length,
        hop_length: frames.hop_length,
        requested_frame_length: spec.frame_length,
        track,
    };
    log::debug!(
        "pitch: {} of {} frames voiced",
        voiced.len(),
        summary.track.len()
    );

    if summary.stats.is_none() {
        return Ok(Outcome::warn(summary, Advisory::NoPitchDetected));
    }
    Ok(match enlarged {
        Some(advisory) => Outcome::Warning(summary, advisory),
        None => Outcome::Ok(summary),
    })
}

/// Period in samples (sub-sample precision) of one frame, or `None` if unvoiced.
fn yin(frame: &[f64], tau_min: usize, tau_max: usize, threshold: f64) -> Option<f64> {
    let window = frame.len() - tau_max;
    let mut diff = vec![0.0; tau_max + 1];
    for (tau, d) in diff.iter_mut().enumerate().skip(1) {
        *d = frame[..window]
            .iter()
            .zip(&frame[tau..tau + window])
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
    }

    let mut cmnd = vec![1.0; tau_max + 1];
    let mut running = 0.0;
    for tau in 1..=tau_max {
        running += diff[tau];
        cmnd[tau] = if running > 0.0 {
            diff[tau] * tau as f64 / running
        } else {
            1.0
        };
    }

    let mut tau = tau_min;
    while tau < tau_max {
        if cmnd[tau] < threshold {
            while tau + 1 < tau_max && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(refine(&cmnd, tau));
        }
        tau += 1;
    }
    None
}

/// Parabolic interpolation of the dip at `tau`.
fn refine(curve: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= curve.len() {
        return tau as f64;
    }
    let (a, b, c) = (curve[tau - 1], curve[tau], curve[tau + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        tau as f64
    } else {
        tau as f64 + 0.5 * (a - c) / denom
    }
}

fn stats(values: &[f64]) -> Option<PitchStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    Some(PitchStats {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        median,
        std: var.sqrt(),
    })
}

/// Coarse register description of an F0 range.
pub fn describe_range(f0_min: f64, f0_max: f64) -> String {
    let mut parts = Vec::new();
    if f0_min < 85.0 {
        parts.push("very low frequencies (sub-bass)");
    }
    if (85.0..=250.0).contains(&f0_min) || (85.0..=250.0).contains(&f0_max) {
        parts.push("bass frequencies (male voice, low instruments)");
    }
    if (250.0..=500.0).contains(&f0_min) || (250.0..=500.0).contains(&f0_max) {
        parts.push("mid-range frequencies (female voice, mid instruments)");
    }
    if f0_max > 500.0 {
        parts.push("high frequencies (high voice, high-pitched sounds)");
    }
    if parts.is_empty() {
        "unclassified frequency range".to_string()
    } else {
        parts.join(" | ")
    }
}
