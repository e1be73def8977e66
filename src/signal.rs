//! Immutable sampled signal shared between pipeline stages.

use std::sync::Arc;

use crate::error::{Error, Result};

/// A mono sequence of samples taken at a fixed rate.
///
/// Samples are held behind an `Arc<[f64]>` so clones are cheap and stages can
/// share the same buffer read-only. Every conditioning stage returns a new
/// `Signal` instead of mutating its input.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Arc<[f64]>,
    sample_rate: u32,
}

impl Signal {
    /// Validate and wrap `samples` recorded at `sample_rate` Hz.
    ///
    /// Fails with [`Error::EmptyInput`] for zero samples,
    /// [`Error::InvalidConfiguration`] for a zero rate and
    /// [`Error::DegenerateInput`] when no sample is finite.
    pub fn new(samples: impl Into<Arc<[f64]>>, sample_rate: u32) -> Result<Self> {
        let samples = samples.into();
        if sample_rate == 0 {
            return Err(Error::config("sample_rate", "must be greater than zero"));
        }
        if samples.is_empty() {
            return Err(Error::EmptyInput);
        }
        if !samples.iter().any(|s| s.is_finite()) {
            return Err(Error::DegenerateInput(
                "signal contains no finite samples".into(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Build a signal of `len` samples by evaluating `f` at each sample time in seconds.
    pub fn from_fn(len: usize, sample_rate: u32, f: impl Fn(f64) -> f64) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::config("sample_rate", "must be greater than zero"));
        }
        let dt = 1.0 / sample_rate as f64;
        let samples: Vec<f64> = (0..len).map(|i| f(i as f64 * dt)).collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false` for a constructed signal; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Half the sample rate.
    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Derive a new signal at the same rate from processed samples.
    pub fn derive(&self, samples: Vec<f64>) -> Result<Self> {
        Self::new(samples, self.sample_rate)
    }

    /// `true` when both signals share the same sample buffer.
    pub fn shares_buffer(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}
