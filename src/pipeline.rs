//! End-to-end analysis: conditioning, transform, decibel scaling and rendering.

use image::RgbImage;

use crate::decibel::to_decibel;
use crate::error::{Advisory, Result};
use crate::filter::{apply_lowpass, FilterSpec};
use crate::hilbert::demodulate_envelope;
use crate::matrix::Matrix;
use crate::progress::RunControl;
use crate::signal::Signal;
use crate::transform::{TransformKind, TransformResult};
use crate::visual::{render_image, Artifact, ArtifactSink, RenderSpec};

/// Everything needed to turn a signal into an image.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalysisConfig {
    /// Optional zero-phase lowpass applied first.
    pub filter: Option<FilterSpec>,
    /// Replace the signal by its zero-mean Hilbert envelope after filtering.
    pub demodulate: bool,
    pub transform: TransformKind,
    pub render: RenderSpec,
}

/// Intermediate and final products of [`analyze`].
#[derive(Clone, Debug)]
pub struct Analysis {
    /// The signal after filtering and demodulation.
    pub signal: Signal,
    pub transform: TransformResult,
    /// Max-referenced dB, same shape as the coefficients.
    pub decibels: Matrix<f64>,
    pub image: RgbImage,
    /// Non-fatal conditions met along the way, in stage order.
    pub advisories: Vec<Advisory>,
}

impl Analysis {
    /// Hand the rendered image to `sink`.
    pub fn save<S: ArtifactSink + ?Sized>(&self, sink: &mut S) -> Result<Artifact> {
        sink.write(&self.image)
    }
}

/// Apply the optional lowpass and demodulation stages.
pub fn condition(
    signal: &Signal,
    filter: Option<&FilterSpec>,
    demodulate: bool,
) -> Result<(Signal, Vec<Advisory>)> {
    let mut advisories = Vec::new();
    let mut current = signal.clone();
    if let Some(spec) = filter {
        let (filtered, advisory) = apply_lowpass(&current, spec)?.into_parts();
        advisories.extend(advisory);
        current = filtered;
    }
    if demodulate {
        current = demodulate_envelope(&current)?;
    }
    Ok((current, advisories))
}

/// Run every configured stage on `signal`.
pub fn analyze(signal: &Signal, config: &AnalysisConfig, control: &RunControl) -> Result<Analysis> {
    config.render.validate()?;
    log::info!(
        "analysing {:.3} s at {} Hz with {}",
        signal.duration(),
        signal.sample_rate(),
        config.transform.name()
    );
    let (conditioned, advisories) =
        condition(signal, config.filter.as_ref(), config.demodulate)?;

    let transform = config.transform.build().compute(&conditioned, control)?;
    let decibels = to_decibel(&transform.coefficients)?;
    let image = render_image(
        &decibels,
        &transform.times,
        &transform.frequencies,
        &config.render,
    )?;

    Ok(Analysis {
        signal: conditioned,
        transform,
        decibels,
        image,
        advisories,
    })
}
