//! Error and advisory types shared by every pipeline stage.
//!
//! Hard failures are reported through [`Error`]. Conditions that still allow
//! a well-formed result (a bypassed filter, an enlarged frame) are returned as
//! [`Outcome::Warning`] carrying an [`Advisory`], so callers can test each
//! branch without scraping console output.

use core::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Fatal conditions raised by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied spec violates its invariants.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: String,
    },
    /// Unknown filter design or wavelet family name.
    #[error("unsupported {kind} `{name}`")]
    UnsupportedVariant { kind: &'static str, name: String },
    /// Zero-length input.
    #[error("input contains no samples")]
    EmptyInput,
    /// Input exists but carries no usable data (for example all NaN).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
    /// A matrix and its axes disagree in shape.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    /// A computation produced non-finite output.
    #[error("numeric degeneracy: {0}")]
    NumericDegeneracy(String),
    /// A [`CancelToken`](crate::progress::CancelToken) was triggered.
    #[error("computation cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl Error {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Non-fatal condition attached to an otherwise valid result.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// The lowpass cutoff was at or above Nyquist; the signal passed through unfiltered.
    CutoffAboveNyquist { cutoff_hz: f64, nyquist_hz: f64 },
    /// The filter order is high enough to risk numerical instability.
    HighFilterOrder { order: usize },
    /// The analysis frame was enlarged to hold two periods of the lowest frequency.
    FrameEnlarged {
        frame_length: usize,
        hop_length: usize,
    },
    /// Pitch tracking found no voiced frame.
    NoPitchDetected,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::CutoffAboveNyquist {
                cutoff_hz,
                nyquist_hz,
            } => write!(
                f,
                "cutoff {cutoff_hz} Hz is not below Nyquist ({nyquist_hz} Hz); lowpass filter bypassed"
            ),
            Advisory::HighFilterOrder { order } => {
                write!(f, "filter order {order} may be numerically unstable")
            }
            Advisory::FrameEnlarged {
                frame_length,
                hop_length,
            } => write!(
                f,
                "frame enlarged to {frame_length} samples (hop {hop_length})"
            ),
            Advisory::NoPitchDetected => write!(f, "no fundamental frequency detected"),
        }
    }
}

/// A value that may carry an [`Advisory`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Warning(T, Advisory),
}

impl<T> Outcome<T> {
    /// Build a warning outcome and forward the advisory to the log.
    pub(crate) fn warn(value: T, advisory: Advisory) -> Self {
        log::warn!("{advisory}");
        Outcome::Warning(value, advisory)
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(v) | Outcome::Warning(v, _) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(v) | Outcome::Warning(v, _) => v,
        }
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Warning(_, a) => Some(a),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Outcome::Warning(..))
    }

    /// Split into the value and the optional advisory.
    pub fn into_parts(self) -> (T, Option<Advisory>) {
        match self {
            Outcome::Ok(v) => (v, None),
            Outcome::Warning(v, a) => (v, Some(a)),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Warning(v, a) => Outcome::Warning(f(v), a),
        }
    }
}
