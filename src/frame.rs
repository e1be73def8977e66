//! Frame and hop bookkeeping shared by the STFT, mel and pitch stages.

use num_complex::Complex64;

use crate::error::{Advisory, Error, Outcome, Result};
use crate::window::WindowKind;

/// Framing parameters for short-time analysis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FrameSpec {
    /// Samples per analysis frame.
    pub frame_length: usize,
    /// Samples between successive frame starts.
    pub hop_length: usize,
    pub window: WindowKind,
    /// FFT size; defaults to `frame_length`. Frames are zero-padded up to it.
    pub fft_length: Option<usize>,
    /// Emit a final zero-padded frame so every sample is covered.
    pub pad_tail: bool,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self::new(2048, 512)
    }
}

impl FrameSpec {
    /// Hann-windowed frames with `fft_length == frame_length` and no tail padding.
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            frame_length,
            hop_length,
            window: WindowKind::Hann,
            fft_length: None,
            pad_tail: false,
        }
    }

    pub fn with_window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }

    pub fn with_fft_length(mut self, fft_length: usize) -> Self {
        self.fft_length = Some(fft_length);
        self
    }

    pub fn with_pad_tail(mut self, pad_tail: bool) -> Self {
        self.pad_tail = pad_tail;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_length == 0 {
            return Err(Error::config("frame_length", "must be at least 1"));
        }
        if self.hop_length == 0 {
            return Err(Error::config("hop_length", "must be at least 1"));
        }
        if let Some(n) = self.fft_length {
            if n < self.frame_length {
                return Err(Error::config(
                    "fft_length",
                    format!("{n} is shorter than frame_length {}", self.frame_length),
                ));
            }
        }
        Ok(())
    }

    /// Effective FFT size.
    pub fn fft_len(&self) -> usize {
        self.fft_length.unwrap_or(self.frame_length)
    }

    /// Number of one-sided frequency bins, `fft_len / 2 + 1`.
    pub fn bins(&self) -> usize {
        self.fft_len() / 2 + 1
    }

    /// Frames produced for a signal of `len` samples.
    ///
    /// Without tail padding this is `1 + (len - frame_length) / hop_length`,
    /// or zero when the signal is shorter than one frame. With tail padding
    /// the division rounds up and at least one frame is produced.
    pub fn frame_count(&self, len: usize) -> usize {
        if self.hop_length == 0 || len == 0 {
            return 0;
        }
        if self.pad_tail {
            if len <= self.frame_length {
                1
            } else {
                1 + (len - self.frame_length).div_ceil(self.hop_length)
            }
        } else if len < self.frame_length {
            0
        } else {
            1 + (len - self.frame_length) / self.hop_length
        }
    }

    /// Start time in seconds of each of `count` frames.
    pub fn frame_times(&self, count: usize, sample_rate: u32) -> Vec<f64> {
        let sr = sample_rate as f64;
        (0..count)
            .map(|i| (i * self.hop_length) as f64 / sr)
            .collect()
    }

    /// Centre frequency in Hz of each one-sided FFT bin.
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f64> {
        let n = self.fft_len() as f64;
        let sr = sample_rate as f64;
        (0..self.bins()).map(|k| k as f64 * sr / n).collect()
    }

    /// Enlarge the frame so it holds two periods of `fmin`.
    ///
    /// When `frame_length` is below `ceil(2 * sample_rate / fmin) + 2` the
    /// frame grows to that length, the hop becomes a quarter of it, any
    /// explicit FFT length shorter than the new frame is dropped, and the
    /// change is reported as [`Advisory::FrameEnlarged`].
    pub fn fit_for_periodicity(&self, sample_rate: u32, fmin: f64) -> Result<Outcome<FrameSpec>> {
        if !(fmin.is_finite() && fmin > 0.0) {
            return Err(Error::config("fmin", "must be a positive frequency"));
        }
        if sample_rate == 0 {
            return Err(Error::config("sample_rate", "must be greater than zero"));
        }
        let min_frame = (2.0 * sample_rate as f64 / fmin).ceil() as usize + 2;
        if self.frame_length >= min_frame {
            return Ok(Outcome::Ok(*self));
        }
        let mut fitted = *self;
        fitted.frame_length = min_frame;
        fitted.hop_length = (min_frame / 4).max(1);
        if fitted.fft_length.is_some_and(|n| n < min_frame) {
            fitted.fft_length = None;
        }
        Ok(Outcome::warn(
            fitted,
            Advisory::FrameEnlarged {
                frame_length: fitted.frame_length,
                hop_length: fitted.hop_length,
            },
        ))
    }

    /// Copy frame `index` of `samples` into `buf`, windowed and zero-padded to `buf.len()`.
    pub(crate) fn fill_frame(
        &self,
        samples: &[f64],
        index: usize,
        window: &[f64],
        buf: &mut [Complex64],
    ) {
        let start = index * self.hop_length;
        for (i, slot) in buf.iter_mut().enumerate() {
            let x = if i < self.frame_length {
                samples.get(start + i).copied().unwrap_or(0.0) * window[i]
            } else {
                0.0
            };
            *slot = Complex64::new(x, 0.0);
        }
    }

    /// Raw samples of frame `index`, zero-padded past the end of `samples`.
    ///
    /// No window is applied; [`FrameSpec::fill_frame`] does the windowing.
    pub(crate) fn frame_samples<'a>(
        &'a self,
        samples: &'a [f64],
        index: usize,
    ) -> impl Iterator<Item = f64> + 'a {
        let start = index * self.hop_length;
        (0..self.frame_length).map(move |i| samples.get(start + i).copied().unwrap_or(0.0))
    }
}
