//! Run settings merged from built-in defaults, a TOML file, the environment and flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tfscope::filter::{FilterKind, FilterSpec, DEFAULT_FILTER_ORDER};
use tfscope::frame::FrameSpec;
use tfscope::mel::DEFAULT_MEL_BANDS;
use tfscope::pitch::PitchSpec;
use tfscope::visual::{Colormap, FrequencyScale, RenderSpec};
use tfscope::wavelet::{ScaleSpec, WaveletKind};
use tfscope::window::WindowKind;

use crate::DEFAULT_OUTPUT_DIR;

/// Environment variable overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "TFSCOPE_OUTPUT_DIR";

/// Lowest displayed level in dB.
pub const DEFAULT_VMIN: f64 = -60.0;
/// Top of the frequency axis in Hz.
pub const DEFAULT_CEILING_HZ: f64 = 4000.0;
pub const DEFAULT_CSV_CHANNEL: &str = "CH1V";

/// Every tunable setting, all optional so layers can be stacked.
///
/// Variant-valued settings (`window`, `filter_kind`, `wavelet`, `colormap`)
/// use the same textual names as the command line, e.g. `"kaiser:8.6"`,
/// `"cheby1:0.5"`, `"cgau4"` or `"cmor1.5-1.0"`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub output_dir: Option<PathBuf>,
    pub channel: Option<String>,
    pub sample_rate: Option<u32>,

    pub cutoff_hz: Option<f64>,
    pub filter_order: Option<usize>,
    pub filter_kind: Option<String>,
    pub demodulate: Option<bool>,
    pub export_wav: Option<bool>,

    pub frame_length: Option<usize>,
    pub hop_length: Option<usize>,
    pub fft_length: Option<usize>,
    pub window: Option<String>,
    pub pad_tail: Option<bool>,
    pub n_mels: Option<usize>,

    pub wavelet: Option<String>,
    pub scale_min: Option<f64>,
    pub scale_max: Option<f64>,
    pub scale_count: Option<usize>,

    pub vmin: Option<f64>,
    pub frequency_ceiling: Option<f64>,
    pub colormap: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub mel_axis: Option<bool>,
    pub svg: Option<bool>,
    pub title: Option<String>,

    pub fmin: Option<f64>,
    pub fmax: Option<f64>,
    pub threshold: Option<f64>,
}

macro_rules! overlay_fields {
    ($base:ident, $top:ident, $($field:ident),+ $(,)?) => {
        $(
            if $top.$field.is_some() {
                $base.$field = $top.$field;
            }
        )+
    };
}

impl RunConfig {
    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Replace every field that `top` sets.
    pub fn overlay(mut self, top: RunConfig) -> Self {
        overlay_fields!(
            self, top, output_dir, channel, sample_rate, cutoff_hz, filter_order, filter_kind,
            demodulate, export_wav, frame_length, hop_length, fft_length, window, pad_tail, n_mels,
            wavelet, scale_min, scale_max, scale_count, vmin, frequency_ceiling, colormap, width,
            height, mel_axis, svg, title, fmin, fmax, threshold,
        );
        self
    }

    /// Directory for artifacts: flag or file first, then `TFSCOPE_OUTPUT_DIR`, then the default.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(|| std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(DEFAULT_CSV_CHANNEL)
    }

    /// `None` when no cutoff is configured.
    pub fn filter_spec(&self) -> Result<Option<FilterSpec>> {
        let Some(cutoff) = self.cutoff_hz else {
            return Ok(None);
        };
        let kind = match &self.filter_kind {
            Some(name) => name.parse::<FilterKind>()?,
            None => FilterKind::default(),
        };
        let order = self.filter_order.unwrap_or(DEFAULT_FILTER_ORDER);
        Ok(Some(FilterSpec::lowpass(cutoff, order).with_kind(kind)))
    }

    pub fn frame_spec(&self) -> Result<FrameSpec> {
        let defaults = FrameSpec::default();
        let window = match &self.window {
            Some(name) => name.parse::<WindowKind>()?,
            None => WindowKind::Hann,
        };
        let mut spec = FrameSpec::new(
            self.frame_length.unwrap_or(defaults.frame_length),
            self.hop_length.unwrap_or(defaults.hop_length),
        )
        .with_window(window)
        .with_pad_tail(self.pad_tail.unwrap_or(false));
        if let Some(n) = self.fft_length {
            spec = spec.with_fft_length(n);
        }
        spec.validate()?;
        Ok(spec)
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels.unwrap_or(DEFAULT_MEL_BANDS)
    }

    pub fn wavelet(&self) -> Result<WaveletKind> {
        Ok(match &self.wavelet {
            Some(name) => name.parse()?,
            None => WaveletKind::default(),
        })
    }

    pub fn scale_spec(&self) -> ScaleSpec {
        let defaults = ScaleSpec::default();
        ScaleSpec::new(
            self.scale_min.unwrap_or(defaults.scale_min),
            self.scale_max.unwrap_or(defaults.scale_max),
            self.scale_count.unwrap_or(defaults.scale_count),
        )
    }

    /// Render settings; `mel_axis` is the fallback when the config does not choose.
    pub fn render_spec(&self, mel_axis: bool) -> Result<RenderSpec> {
        let defaults = RenderSpec::default();
        let colormap = match &self.colormap {
            Some(name) => name.parse::<Colormap>()?,
            None => defaults.colormap,
        };
        let frequency_scale = if self.mel_axis.unwrap_or(mel_axis) {
            FrequencyScale::Mel
        } else {
            FrequencyScale::Linear
        };
        let spec = RenderSpec {
            vmin: self.vmin.unwrap_or(DEFAULT_VMIN),
            frequency_ceiling: self.frequency_ceiling.unwrap_or(DEFAULT_CEILING_HZ),
            colormap,
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            frequency_scale,
            title: self.title.clone(),
            caption: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn pitch_spec(&self) -> Result<PitchSpec> {
        let defaults = PitchSpec::default();
        let spec = PitchSpec {
            fmin: self.fmin.unwrap_or(defaults.fmin),
            fmax: self.fmax.unwrap_or(defaults.fmax),
            frame_length: self.frame_length.unwrap_or(defaults.frame_length),
            hop_length: self.hop_length.unwrap_or(defaults.hop_length),
            threshold: self.threshold.unwrap_or(defaults.threshold),
        };
        spec.validate()?;
        Ok(spec)
    }
}
