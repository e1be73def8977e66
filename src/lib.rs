//! # tfscope - Offline time-frequency analysis for Rust
//!
//! Turns a sampled signal (oscilloscope capture, audio file, synthetic test
//! tone) into a spectrogram or scalogram image. The stages can be used on
//! their own or chained through [`pipeline::analyze`].
//!
//! ## Features
//!
//! - **Zero-phase lowpass**: Butterworth and Chebyshev type I, applied forward and backward
//! - **Envelope demodulation** via the FFT analytic signal
//! - **Transforms**: framed STFT, continuous wavelet transform, mel projection
//! - **Max-referenced decibels**: the strongest cell is always 0 dB
//! - **Rendering**: colour-mapped heatmap with axes and a colour bar, written as PNG
//! - **Pitch statistics** using the YIN estimator
//! - **Progress and cancellation** hooks for long transforms
//!
//! ## Cargo Features
//!
//! - `parallel`: Compute STFT frames and CWT scales with Rayon
//! - `serde`: Derive `Serialize`/`Deserialize` for every configuration type
//!
//! ## Quick start
//!
//! ```no_run
//! use tfscope::prelude::*;
//!
//! let signal = Signal::from_fn(48_000, 48_000, |t| (2.0 * std::f64::consts::PI * 440.0 * t).sin())?;
//! let config = AnalysisConfig {
//!     filter: Some(FilterSpec::lowpass(2000.0, 4)),
//!     transform: TransformKind::Stft(FrameSpec::new(2048, 512)),
//!     ..AnalysisConfig::default()
//! };
//! let analysis = analyze(&signal, &config, &RunControl::default())?;
//! analysis.save(&mut PngSink::new("tone.png"))?;
//! # Ok::<(), tfscope::Error>(())
//! ```
//!
//! ## Examples
//!
//! Run the demos with:
//! ```bash
//! cargo run --example two_tone
//! cargo run --example scalogram
//! RUST_LOG=debug cargo run --example verbose_logging
//! ```

pub mod error;
pub mod matrix;
pub mod signal;

/// Window functions applied to each analysis frame.
pub mod window;

/// Frame layout shared by the STFT and pitch analysis.
pub mod frame;

pub mod progress;

/// Zero-phase IIR lowpass filtering.
pub mod filter;

/// Analytic signal and envelope demodulation.
pub mod hilbert;

/// Short-time Fourier transform.
pub mod stft;

/// Continuous wavelet transform.
pub mod wavelet;

pub mod mel;
pub mod decibel;
pub mod pitch;
pub mod transform;
pub mod visual;
pub mod pipeline;

pub use error::{Advisory, Error, Outcome, Result};
pub use matrix::Matrix;
pub use num_complex::Complex64;
pub use signal::Signal;

/// The types most callers need.
pub mod prelude {
    pub use crate::decibel::{power_to_decibel, to_decibel};
    pub use crate::error::{Advisory, Error, Outcome, Result};
    pub use crate::filter::{apply_lowpass, CutoffPolicy, FilterKind, FilterSpec};
    pub use crate::frame::FrameSpec;
    pub use crate::hilbert::demodulate_envelope;
    pub use crate::matrix::Matrix;
    pub use crate::mel::to_mel;
    pub use crate::pipeline::{analyze, Analysis, AnalysisConfig};
    pub use crate::pitch::{analyze_pitch, PitchSpec, PitchSummary};
    pub use crate::progress::{CancelToken, RunControl};
    pub use crate::signal::Signal;
    pub use crate::stft::compute_stft;
    pub use crate::transform::{Transform, TransformKind, TransformResult};
    pub use crate::visual::{render, Colormap, FrequencyScale, MemorySink, PngSink, RenderSpec};
    pub use crate::wavelet::{compute_cwt, ScaleSpec, WaveletKind};
    pub use crate::window::WindowKind;
}
