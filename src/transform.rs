//! Transform results and the common interface over STFT, CWT and mel analysis.

use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::frame::FrameSpec;
use crate::matrix::Matrix;
use crate::mel::{to_mel, DEFAULT_MEL_BANDS};
use crate::progress::RunControl;
use crate::signal::Signal;
use crate::stft::compute_stft_with;
use crate::wavelet::{compute_cwt_with, ScaleSpec, WaveletKind};

/// Complex coefficients with their frequency and time axes.
///
/// Rows follow `frequencies` and columns follow `times`; the lengths are
/// checked on construction.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformResult {
    pub coefficients: Matrix<Complex64>,
    /// Hz, one per row.
    pub frequencies: Vec<f64>,
    /// Seconds, one per column.
    pub times: Vec<f64>,
}

impl TransformResult {
    pub fn new(
        coefficients: Matrix<Complex64>,
        frequencies: Vec<f64>,
        times: Vec<f64>,
    ) -> Result<Self> {
        if coefficients.rows() != frequencies.len() {
            return Err(Error::DimensionMismatch {
                what: "frequency axis",
                expected: coefficients.rows(),
                got: frequencies.len(),
            });
        }
        if coefficients.cols() != times.len() {
            return Err(Error::DimensionMismatch {
                what: "time axis",
                expected: coefficients.cols(),
                got: times.len(),
            });
        }
        Ok(Self {
            coefficients,
            frequencies,
            times,
        })
    }

    /// `|c|` for every coefficient.
    pub fn magnitudes(&self) -> Matrix<f64> {
        self.coefficients.map(|c| c.norm())
    }
}

/// Which time-frequency representation to compute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TransformKind {
    Stft(FrameSpec),
    Cwt {
        scales: ScaleSpec,
        wavelet: WaveletKind,
    },
    Mel {
        frames: FrameSpec,
        n_mels: usize,
    },
}

impl Default for TransformKind {
    fn default() -> Self {
        TransformKind::Stft(FrameSpec::default())
    }
}

impl TransformKind {
    /// Boxed [`Transform`] implementing this kind.
    pub fn build(&self) -> Box<dyn Transform> {
        match self {
            TransformKind::Stft(frames) => Box::new(StftTransform { frames: *frames }),
            TransformKind::Cwt { scales, wavelet } => Box::new(CwtTransform {
                scales: scales.clone(),
                wavelet: *wavelet,
            }),
            TransformKind::Mel { frames, n_mels } => Box::new(MelTransform {
                frames: *frames,
                n_mels: *n_mels,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Stft(_) => "stft",
            TransformKind::Cwt { .. } => "cwt",
            TransformKind::Mel { .. } => "mel",
        }
    }
}

/// A time-frequency transform of a [`Signal`].
pub trait Transform {
    fn compute(&self, signal: &Signal, control: &RunControl) -> Result<TransformResult>;

    fn kind(&self) -> TransformKind;
}

/// Framed FFT analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StftTransform {
    pub frames: FrameSpec,
}

impl Transform for StftTransform {
    fn compute(&self, signal: &Signal, control: &RunControl) -> Result<TransformResult> {
        compute_stft_with(signal, &self.frames, control)
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Stft(self.frames)
    }
}

/// Continuous wavelet analysis across scales.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CwtTransform {
    pub scales: ScaleSpec,
    pub wavelet: WaveletKind,
}

impl Transform for CwtTransform {
    fn compute(&self, signal: &Signal, control: &RunControl) -> Result<TransformResult> {
        compute_cwt_with(signal, &self.scales, self.wavelet, control)
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Cwt {
            scales: self.scales.clone(),
            wavelet: self.wavelet,
        }
    }
}

/// STFT power projected onto mel bands.
///
/// The coefficients are band amplitudes (square roots of band power), so the
/// usual decibel conversion of `|c|^2` yields the mel power in dB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MelTransform {
    pub frames: FrameSpec,
    pub n_mels: usize,
}

impl Default for MelTransform {
    fn default() -> Self {
        Self {
            frames: FrameSpec::default(),
            n_mels: DEFAULT_MEL_BANDS,
        }
    }
}

impl Transform for MelTransform {
    fn compute(&self, signal: &Signal, control: &RunControl) -> Result<TransformResult> {
        let stft = compute_stft_with(signal, &self.frames, control)?;
        let mel = to_mel(&stft, self.n_mels)?;
        let amplitudes = mel.power.map(|p| Complex64::new(p.sqrt(), 0.0));
        TransformResult::new(amplitudes, mel.frequencies, mel.times)
    }

    fn kind(&self) -> TransformKind {
        TransformKind::Mel {
            frames: self.frames,
            n_mels: self.n_mels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_must_match_shape() {
        let m = Matrix::filled(3, 2, Complex64::new(1.0, 0.0));
        assert!(TransformResult::new(m.clone(), vec![0.0; 3], vec![0.0; 2]).is_ok());
        assert!(matches!(
            TransformResult::new(m.clone(), vec![0.0; 2], vec![0.0; 2]),
            Err(Error::DimensionMismatch {
                what: "frequency axis",
                ..
            })
        ));
        assert!(matches!(
            TransformResult::new(m, vec![0.0; 3], vec![0.0; 5]),
            Err(Error::DimensionMismatch { what: "time axis", .. })
        ));
    }

    #[test]
    fn kinds_build_matching_transforms() {
        let kinds = [
            TransformKind::Stft(FrameSpec::new(256, 64)),
            TransformKind::Cwt {
                scales: ScaleSpec::new(1.0, 8.0, 4),
                wavelet: WaveletKind::MexicanHat,
            },
            TransformKind::Mel {
                frames: FrameSpec::new(256, 64),
                n_mels: 20,
            },
        ];
        for kind in kinds {
            assert_eq!(kind.build().kind(), kind);
        }
    }

    #[test]
    fn mel_transform_has_one_row_per_band() {
        let signal = Signal::from_fn(4000, 8000, |t| (2.0 * std::f64::consts::PI * 440.0 * t).sin())
            .unwrap();
        let mel = MelTransform {
            frames: FrameSpec::new(512, 256),
            n_mels: 32,
        };
        let result = mel.compute(&signal, &RunControl::new()).unwrap();
        assert_eq!(result.coefficients.rows(), 32);
        assert_eq!(result.frequencies.len(), 32);
        assert!(result.coefficients.as_slice().iter().all(|c| c.im == 0.0));
    }
}
