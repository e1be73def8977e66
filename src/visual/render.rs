//! Heatmap rendering of decibel matrices with axes and a colour bar.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::mel::{hz_to_mel, mel_to_hz};
use crate::visual::colormap::Colormap;
use crate::visual::glyph::{self, GLYPH_HEIGHT};

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const TICK_LENGTH: i64 = 4;
/// Below this size only the heatmap is drawn.
const MIN_DECORATED_WIDTH: u32 = 160;
const MIN_DECORATED_HEIGHT: u32 = 80;
const MIN_DIMENSION: u32 = 16;

/// Vertical axis warping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FrequencyScale {
    #[default]
    Linear,
    /// Equal pixel spacing per mel.
    Mel,
}

impl FrequencyScale {
    fn warp(self, hz: f64) -> f64 {
        match self {
            FrequencyScale::Linear => hz,
            FrequencyScale::Mel => hz_to_mel(hz),
        }
    }

    fn unwarp(self, v: f64) -> f64 {
        match self {
            FrequencyScale::Linear => v,
            FrequencyScale::Mel => mel_to_hz(v),
        }
    }
}

/// Rendering parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RenderSpec {
    /// Lowest displayed level in dB; quieter cells saturate to the bottom colour.
    pub vmin: f64,
    /// Top of the frequency axis in Hz.
    pub frequency_ceiling: f64,
    pub colormap: Colormap,
    pub width: u32,
    pub height: u32,
    pub frequency_scale: FrequencyScale,
    /// Heading centred above the plot.
    pub title: Option<String>,
    /// Parameter line centred under the time axis.
    pub caption: Option<String>,
}

impl Default for RenderSpec {
    fn default() -> Self {
        Self {
            vmin: -80.0,
            frequency_ceiling: 5000.0,
            colormap: Colormap::Jet,
            width: 1600,
            height: 1000,
            frequency_scale: FrequencyScale::Linear,
            title: None,
            caption: None,
        }
    }
}

impl RenderSpec {
    pub fn validate(&self) -> Result<()> {
        if !(self.vmin.is_finite() && self.vmin < 0.0) {
            return Err(Error::config("vmin", "must be a finite negative dB level"));
        }
        if !(self.frequency_ceiling.is_finite() && self.frequency_ceiling > 0.0) {
            return Err(Error::config("frequency_ceiling", "must be a positive frequency"));
        }
        if self.width < MIN_DIMENSION || self.height < MIN_DIMENSION {
            return Err(Error::config(
                "width",
                format!(
                    "image must be at least {MIN_DIMENSION}x{MIN_DIMENSION} pixels, got {}x{}",
                    self.width, self.height
                ),
            ));
        }
        Ok(())
    }

    /// Position of `db` on the colour scale, `0` at `vmin` and `1` at 0 dB.
    fn level(&self, db: f64) -> f64 {
        ((db - self.vmin) / -self.vmin).clamp(0.0, 1.0)
    }
}

/// Description of a written image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Destination file, `None` for in-memory sinks.
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
}

/// Destination for rendered images.
pub trait ArtifactSink {
    fn write(&mut self, image: &RgbImage) -> Result<Artifact>;
}

/// Writes 8-bit RGB PNG files.
#[derive(Clone, Debug)]
pub struct PngSink {
    path: PathBuf,
}

impl PngSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactSink for PngSink {
    fn write(&mut self, image: &RgbImage) -> Result<Artifact> {
        let file = BufWriter::new(File::create(&self.path)?);
        let encoder =
            PngEncoder::new_with_quality(file, CompressionType::Best, FilterType::Adaptive);
        let (width, height) = image.dimensions();
        encoder.write_image(image.as_raw(), width, height, ColorType::Rgb8)?;
        log::info!("wrote {}x{} png to {}", width, height, self.path.display());
        Ok(Artifact {
            path: Some(self.path.clone()),
            width,
            height,
        })
    }
}

/// Keeps the last rendered image in memory.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub image: Option<RgbImage>,
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, image: &RgbImage) -> Result<Artifact> {
        self.image = Some(image.clone());
        Ok(Artifact {
            path: None,
            width: image.width(),
            height: image.height(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Rect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl Rect {
    fn right(&self) -> u32 {
        self.x + self.width
    }

    fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

#[derive(Clone, Copy, Debug)]
struct Layout {
    plot: Rect,
    colorbar: Option<Rect>,
    text_scale: u32,
}

impl Layout {
    /// `title` and `caption` each reserve one text line above or below the axes.
    fn new(width: u32, height: u32, title: bool, caption: bool) -> Self {
        if width < MIN_DECORATED_WIDTH || height < MIN_DECORATED_HEIGHT {
            return Self {
                plot: Rect { x: 0, y: 0, width, height },
                colorbar: None,
                text_scale: 1,
            };
        }
        let text_scale = if width >= 800 && height >= 400 { 2 } else { 1 };
        let char_w = glyph::GLYPH_ADVANCE * text_scale;
        let char_h = GLYPH_HEIGHT * text_scale;
        let text_line = char_h + 4;
        let left = 6 * char_w + 2 * TICK_LENGTH as u32;
        let top = char_h * 2 + 4 + if title { text_line } else { 0 };
        let bottom =
            char_h * 2 + 2 * TICK_LENGTH as u32 + 4 + if caption { text_line } else { 0 };
        let bar_width = (width / 40).max(8);
        let right = bar_width + 5 * char_w + 3 * TICK_LENGTH as u32;
        let plot = Rect {
            x: left,
            y: top,
            width: width - left - right,
            height: height - top - bottom,
        };
        let colorbar = Rect {
            x: plot.right() + TICK_LENGTH as u32,
            y: plot.y,
            width: bar_width,
            height: plot.height,
        };
        Self {
            plot,
            colorbar: Some(colorbar),
            text_scale,
        }
    }
}

/// Render a `frequencies x times` dB matrix to an image.
///
/// Rows are looked up nearest-neighbour in `frequencies`, which may be
/// non-uniform and in either order. Pixels above the ceiling or outside the
/// span covered by the axis are left as background.
pub fn render_image(
    decibels: &Matrix<f64>,
    times: &[f64],
    frequencies: &[f64],
    spec: &RenderSpec,
) -> Result<RgbImage> {
    spec.validate()?;
    if decibels.is_empty() {
        return Err(Error::EmptyInput);
    }
    if decibels.rows() != frequencies.len() {
        return Err(Error::DimensionMismatch {
            what: "frequency axis",
            expected: decibels.rows(),
            got: frequencies.len(),
        });
    }
    if decibels.cols() != times.len() {
        return Err(Error::DimensionMismatch {
            what: "time axis",
            expected: decibels.cols(),
            got: times.len(),
        });
    }

    let layout = Layout::new(
        spec.width,
        spec.height,
        spec.title.is_some(),
        spec.caption.is_some(),
    );
    let mut img = RgbImage::from_pixel(spec.width, spec.height, BACKGROUND);
    let axis = RowLookup::new(frequencies);
    let plot = layout.plot;
    let top = spec.frequency_scale.warp(spec.frequency_ceiling);
    let bottom = spec.frequency_scale.warp(0.0);
    let cols = decibels.cols();

    for py in 0..plot.height {
        let frac = (py as f64 + 0.5) / plot.height as f64;
        let hz = spec.frequency_scale.unwarp(top - (top - bottom) * frac);
        let Some(row) = axis.nearest(hz) else {
            continue;
        };
        let values = decibels.row(row);
        for px in 0..plot.width {
            let col = (((px as f64 + 0.5) * cols as f64 / plot.width as f64) as usize).min(cols - 1);
            let [r, g, b] = spec.colormap.map(spec.level(values[col]));
            img.put_pixel(plot.x + px, plot.y + py, Rgb([r, g, b]));
        }
    }

    if let Some(bar) = layout.colorbar {
        draw_frame(&mut img, plot);
        draw_time_axis(&mut img, &layout, times);
        draw_frequency_axis(&mut img, &layout, spec);
        draw_colorbar(&mut img, &layout, bar, spec);
        let char_h = (GLYPH_HEIGHT * layout.text_scale) as i64;
        if let Some(title) = &spec.title {
            draw_centered(&mut img, title, 2, layout.text_scale);
        }
        if let Some(caption) = &spec.caption {
            let y = spec.height as i64 - char_h - 2;
            draw_centered(&mut img, caption, y, layout.text_scale);
        }
    }
    Ok(img)
}

/// Render and hand the image to `sink`.
pub fn render<S: ArtifactSink + ?Sized>(
    decibels: &Matrix<f64>,
    times: &[f64],
    frequencies: &[f64],
    spec: &RenderSpec,
    sink: &mut S,
) -> Result<Artifact> {
    let img = render_image(decibels, times, frequencies, spec)?;
    log::debug!(
        "rendered {}x{} matrix into {}x{} {} image",
        decibels.rows(),
        decibels.cols(),
        spec.width,
        spec.height,
        spec.colormap
    );
    sink.write(&img)
}

/// Nearest-row search over an arbitrary frequency axis.
struct RowLookup {
    /// `(frequency, row)` sorted by frequency, non-finite entries dropped.
    sorted: Vec<(f64, usize)>,
    lower: f64,
    upper: f64,
}

impl RowLookup {
    fn new(frequencies: &[f64]) -> Self {
        let mut sorted: Vec<(f64, usize)> = frequencies
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, f)| f.is_finite())
            .map(|(i, f)| (f, i))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        let n = sorted.len();
        let (lower, upper) = match n {
            0 => (f64::INFINITY, f64::NEG_INFINITY),
            1 => (f64::NEG_INFINITY, f64::INFINITY),
            _ => (
                sorted[0].0 - (sorted[1].0 - sorted[0].0) / 2.0,
                sorted[n - 1].0 + (sorted[n - 1].0 - sorted[n - 2].0) / 2.0,
            ),
        };
        Self { sorted, lower, upper }
    }

    fn nearest(&self, hz: f64) -> Option<usize> {
        if !(hz >= self.lower && hz <= self.upper) {
            return None;
        }
        let idx = self.sorted.partition_point(|(f, _)| *f < hz);
        let above = self.sorted.get(idx);
        let below = idx.checked_sub(1).and_then(|i| self.sorted.get(i));
        match (below, above) {
            (Some(b), Some(a)) => Some(if hz - b.0 <= a.0 - hz { b.1 } else { a.1 }),
            (Some(only), None) | (None, Some(only)) => Some(only.1),
            (None, None) => None,
        }
    }
}

/// Step from {1, 2, 5} x 10^k giving roughly `target` intervals over `span`.
fn nice_step(span: f64, target: usize) -> f64 {
    if !span.is_finite() || span <= 0.0 {
        return 1.0;
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let factor = if norm < 1.5 {
        1.0
    } else if norm < 3.5 {
        2.0
    } else if norm < 7.5 {
        5.0
    } else {
        10.0
    };
    factor * magnitude
}

fn ticks(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    let first = (lo / step).ceil() as i64;
    let last = (hi / step + 1e-9).floor() as i64;
    (first..=last).map(|k| k as f64 * step).collect()
}

fn tick_label(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    let text = format!("{value:.decimals$}");
    if text.starts_with("-0") && text.trim_start_matches(&['-', '0', '.'][..]).is_empty() {
        text[1..].to_string()
    } else {
        text
    }
}

fn frequency_label(hz: f64, step: f64) -> String {
    if step >= 1000.0 {
        format!("{}k", tick_label(hz / 1000.0, step / 1000.0))
    } else {
        tick_label(hz, step)
    }
}

fn draw_frame(img: &mut RgbImage, r: Rect) {
    let (x0, y0) = (r.x as i64 - 1, r.y as i64 - 1);
    let (x1, y1) = (r.right() as i64, r.bottom() as i64);
    glyph::line(img, (x0, y0), (x1, y0), INK);
    glyph::line(img, (x0, y1), (x1, y1), INK);
    glyph::line(img, (x0, y0), (x0, y1), INK);
    glyph::line(img, (x1, y0), (x1, y1), INK);
}

fn draw_time_axis(img: &mut RgbImage, layout: &Layout, times: &[f64]) {
    let plot = layout.plot;
    let scale = layout.text_scale;
    let start = times[0];
    let step_in = if times.len() > 1 {
        times[1] - times[0]
    } else {
        0.0
    };
    let end = times[times.len() - 1] + step_in;
    let span = end - start;
    let baseline = plot.bottom() as i64;
    if span > 0.0 && span.is_finite() {
        let step = nice_step(span, 8);
        for t in ticks(start, end, step) {
            let x = plot.x as i64 + ((t - start) / span * plot.width as f64).round() as i64;
            glyph::line(img, (x, baseline), (x, baseline + TICK_LENGTH), INK);
            let label = tick_label(t, step);
            let w = glyph::text_width(&label, scale) as i64;
            glyph::text(img, x - w / 2, baseline + TICK_LENGTH + 2, &label, scale, INK);
        }
    }
    let unit_y = baseline + TICK_LENGTH + 4 + (GLYPH_HEIGHT * scale) as i64;
    let w = glyph::text_width("s", scale) as i64;
    glyph::text(img, plot.right() as i64 - w, unit_y, "s", scale, INK);
}

fn draw_frequency_axis(img: &mut RgbImage, layout: &Layout, spec: &RenderSpec) {
    let plot = layout.plot;
    let scale = layout.text_scale;
    let fs = spec.frequency_scale;
    let top = fs.warp(spec.frequency_ceiling);
    let bottom = fs.warp(0.0);
    let step = nice_step(spec.frequency_ceiling, 8);
    let left = plot.x as i64 - 1;
    let half_glyph = (GLYPH_HEIGHT * scale / 2) as i64;
    let mut last_y = i64::MAX;
    for hz in ticks(0.0, spec.frequency_ceiling, step) {
        let frac = (fs.warp(hz) - bottom) / (top - bottom);
        let y = plot.bottom() as i64 - (frac * plot.height as f64).round() as i64;
        glyph::line(img, (left - TICK_LENGTH, y), (left, y), INK);
        // mel axes crowd labels near the top
        if last_y - y < (GLYPH_HEIGHT * scale) as i64 + 2 {
            continue;
        }
        last_y = y;
        let label = frequency_label(hz, step);
        let w = glyph::text_width(&label, scale) as i64;
        glyph::text(img, left - TICK_LENGTH - 2 - w, y - half_glyph, &label, scale, INK);
    }
    let unit_y = plot.y as i64 - (GLYPH_HEIGHT * scale) as i64 - 4;
    glyph::text(img, 2, unit_y.max(0), "Hz", scale, INK);
}

/// Centre `text` horizontally at row `y`; text wider than the image starts at the left edge.
fn draw_centered(img: &mut RgbImage, text: &str, y: i64, scale: u32) {
    let w = glyph::text_width(text, scale) as i64;
    let x = ((img.width() as i64 - w) / 2).max(2);
    glyph::text(img, x, y, text, scale, INK);
}

fn draw_colorbar(img: &mut RgbImage, layout: &Layout, bar: Rect, spec: &RenderSpec) {
    for py in 0..bar.height {
        let level = 1.0 - (py as f64 + 0.5) / bar.height as f64;
        let [r, g, b] = spec.colormap.map(level);
        for px in 0..bar.width {
            img.put_pixel(bar.x + px, bar.y + py, Rgb([r, g, b]));
        }
    }
    draw_frame(img, bar);

    let scale = layout.text_scale;
    let half_glyph = (GLYPH_HEIGHT * scale / 2) as i64;
    let step = nice_step(-spec.vmin, 6);
    let right = bar.right() as i64;
    for db in ticks(spec.vmin, 0.0, step) {
        let y = bar.y as i64 + ((db / spec.vmin) * bar.height as f64).round() as i64;
        glyph::line(img, (right, y), (right + TICK_LENGTH, y), INK);
        let label = tick_label(db, step);
        glyph::text(img, right + TICK_LENGTH + 2, y - half_glyph, &label, scale, INK);
    }
    let unit_y = bar.y as i64 - (GLYPH_HEIGHT * scale) as i64 - 4;
    glyph::text(img, bar.x as i64, unit_y.max(0), "dB", scale, INK);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(80.0, 6), 10.0);
        assert_eq!(nice_step(5000.0, 8), 500.0);
        assert!((nice_step(2.0, 8) - 0.2).abs() < 1e-12);
        assert_eq!(nice_step(0.0, 8), 1.0);
    }

    #[test]
    fn labels() {
        assert_eq!(tick_label(-20.0, 10.0), "-20");
        assert_eq!(tick_label(0.4, 0.2), "0.4");
        assert_eq!(tick_label(-0.0, 0.5), "0.0");
        assert_eq!(frequency_label(3000.0, 1000.0), "3k");
        assert_eq!(frequency_label(2500.0, 500.0), "2500");
    }

    #[test]
    fn lookup_handles_descending_axes() {
        let axis = RowLookup::new(&[400.0, 200.0, 100.0]);
        assert_eq!(axis.nearest(390.0), Some(0));
        assert_eq!(axis.nearest(160.0), Some(1));
        assert_eq!(axis.nearest(140.0), Some(2));
        // half-spacing beyond each end is covered, further is not
        assert_eq!(axis.nearest(60.0), Some(2));
        assert_eq!(axis.nearest(40.0), None);
        assert_eq!(axis.nearest(500.0), Some(0));
        assert_eq!(axis.nearest(501.0), None);
    }

    #[test]
    fn small_images_have_no_decorations() {
        let layout = Layout::new(32, 32, true, true);
        assert!(layout.colorbar.is_none());
        assert_eq!(layout.plot, Rect { x: 0, y: 0, width: 32, height: 32 });
        let big = Layout::new(1600, 1000, false, false);
        let bar = big.colorbar.unwrap();
        assert!(bar.right() < 1600);
        assert!(big.plot.width > 1000);
    }

    /// A title pushes the plot down and a caption lifts its bottom edge.
    #[test]
    fn text_lines_shrink_the_plot() {
        let bare = Layout::new(400, 240, false, false).plot;
        let titled = Layout::new(400, 240, true, false).plot;
        let captioned = Layout::new(400, 240, false, true).plot;
        assert_eq!(titled.y, bare.y + GLYPH_HEIGHT + 4);
        assert_eq!(titled.bottom(), bare.bottom());
        assert_eq!(captioned.y, bare.y);
        assert_eq!(captioned.bottom(), bare.bottom() - (GLYPH_HEIGHT + 4));
    }

    #[test]
    fn spec_validation() {
        assert!(RenderSpec::default().validate().is_ok());
        let bad = RenderSpec { vmin: 0.0, ..RenderSpec::default() };
        assert!(bad.validate().is_err());
        let tiny = RenderSpec { width: 8, ..RenderSpec::default() };
        assert!(tiny.validate().is_err());
    }
}
