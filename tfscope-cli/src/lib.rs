//! Loaders, output naming and file sinks behind the `tfscope` binary.

pub mod config;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use image::RgbImage;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tfscope::filter::FilterSpec;
use tfscope::transform::TransformKind;
use tfscope::visual::{Artifact, ArtifactSink};
use tfscope::Signal;

/// Sample rate assumed for plain-text captures without an explicit rate.
pub const DEFAULT_TXT_SAMPLE_RATE: u32 = 100_000;

/// Output directory used when neither a flag, the environment nor a config file names one.
pub const DEFAULT_OUTPUT_DIR: &str = "data/output_data";

/// How to interpret an input file.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// Oscilloscope CSV export with a `tInc` header field.
    Csv,
    /// One sample per line.
    Txt,
    /// WAV, FLAC or MP3.
    Audio,
}

impl InputFormat {
    /// Guess the format from the file extension, defaulting to audio.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => InputFormat::Csv,
            Some("txt") | Some("dat") => InputFormat::Txt,
            _ => InputFormat::Audio,
        }
    }
}

/// Load `path` as a mono [`Signal`].
///
/// `channel` selects the CSV column; `sample_rate` overrides the rate found in
/// CSV headers and is required-or-defaulted for text files.
pub fn load_signal(
    path: &Path,
    format: Option<InputFormat>,
    channel: &str,
    sample_rate: Option<u32>,
) -> Result<Signal> {
    let format = format.unwrap_or_else(|| InputFormat::from_path(path));
    let signal = match format {
        InputFormat::Csv => load_csv(path, channel, sample_rate)?,
        InputFormat::Txt => load_txt(path, sample_rate.unwrap_or(DEFAULT_TXT_SAMPLE_RATE))?,
        InputFormat::Audio => {
            let signal = load_audio(path)?;
            if let Some(sr) = sample_rate.filter(|&sr| sr != signal.sample_rate()) {
                bail!(
                    "{} is recorded at {} Hz; resampling to {} Hz is not supported",
                    path.display(),
                    signal.sample_rate(),
                    sr
                );
            }
            signal
        }
    };
    log::info!(
        "loaded {}: {} Hz, {:.2} s, {} samples",
        path.display(),
        signal.sample_rate(),
        signal.duration(),
        signal.len()
    );
    Ok(signal)
}

/// Sample rate encoded as `tInc = <seconds>` somewhere in a CSV header line.
fn sample_rate_from_header(header: &str) -> Option<u32> {
    let rest = &header[header.find("tInc")? + "tInc".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let end = rest
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(rest.len());
    let increment: f64 = rest[..end].parse().ok()?;
    if increment > 0.0 && increment.is_finite() {
        Some((1.0 / increment).round() as u32)
    } else {
        None
    }
}

/// Load one channel of an oscilloscope CSV export.
///
/// Blank and `NaN` cells are dropped. Without `sample_rate`, the rate is read
/// from the `tInc` field of the header.
pub fn load_csv(path: &Path, channel: &str, sample_rate: Option<u32>) -> Result<Signal> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines = text.lines();
    let header = lines
        .next()
        .ok_or_else(|| anyhow!("{} is empty", path.display()))?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let index = columns.iter().position(|c| *c == channel).ok_or_else(|| {
        anyhow!(
            "channel {channel} not found in {}; columns are {:?}",
            path.display(),
            columns
        )
    })?;
    let sample_rate = match sample_rate {
        Some(sr) => sr,
        None => sample_rate_from_header(header).ok_or_else(|| {
            anyhow!(
                "no tInc field in the header of {}; pass --sample-rate",
                path.display()
            )
        })?,
    };

    let mut samples = Vec::new();
    for (n, line) in lines.enumerate() {
        let cell = line.split(',').nth(index).map(str::trim).unwrap_or("");
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            continue;
        }
        let value: f64 = cell
            .parse()
            .with_context(|| format!("{}:{}: bad sample {cell:?}", path.display(), n + 2))?;
        if value.is_finite() {
            samples.push(value);
        }
    }
    Signal::new(samples, sample_rate).with_context(|| format!("loading {}", path.display()))
}

/// Load a text file holding one sample per line (first whitespace-separated field).
pub fn load_txt(path: &Path, sample_rate: u32) -> Result<Signal> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut samples = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        if token.starts_with('#') {
            continue;
        }
        let value: f64 = token
            .parse()
            .with_context(|| format!("{}:{}: bad sample {token:?}", path.display(), n + 1))?;
        samples.push(value);
    }
    Signal::new(samples, sample_rate).with_context(|| format!("loading {}", path.display()))
}

/// Load an audio file, averaging all channels to mono.
///
/// WAV goes through `hound`; everything else through `symphonia`.
pub fn load_audio(path: &Path) -> Result<Signal> {
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
    {
        return read_wav(path);
    }
    decode_with_symphonia(path)
}

fn downmix(interleaved: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}

fn read_wav(path: &Path) -> Result<Signal> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / full_scale))
                .collect::<Result<_, _>>()?
        }
    };
    let samples = downmix(&interleaved, spec.channels as usize);
    Ok(Signal::new(samples, spec.sample_rate)?)
}

/// Decode any container/codec pair symphonia was built with.
pub fn decode_with_symphonia(path: &Path) -> Result<Signal> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow!("{} has no supported audio track", path.display()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| anyhow!("{} has no sample rate", path.display()))?;

    let mut samples = Vec::new();
    let mut buffer: Option<SampleBuffer<f32>> = None;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(err) => {
                skip_corrupt_packet(err)?;
                continue;
            }
        };
        let channels = decoded.spec().channels.count();
        let frames = decoded.frames();
        let buf = sample_buffer(&mut buffer, decoded.capacity(), *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        let interleaved: Vec<f64> = buf.samples()[..frames * channels]
            .iter()
            .map(|&s| f64::from(s))
            .collect();
        samples.extend(downmix(&interleaved, channels));
    }

    if let Some(n) = params.n_frames {
        samples.truncate(n as usize);
    }
    Ok(Signal::new(samples, sample_rate)?)
}

/// `dir/prefix_YYYYmmdd_HHMMSS.extension`, creating `dir` if needed.
///
/// A `_N` suffix is appended when a file of that name already exists.
/// Corrupt packets are logged and dropped; every other decoder error is fatal.
fn skip_corrupt_packet(err: SymphoniaError) -> Result<()> {
    match err {
        SymphoniaError::DecodeError(reason) => {
            log::warn!("skipping undecodable packet: {reason}");
            Ok(())
        }
        other => Err(other.into()),
    }
}

/// Reuse `slot` unless a packet needs more than `frames` per channel of room.
fn sample_buffer(
    slot: &mut Option<SampleBuffer<f32>>,
    frames: usize,
    spec: SignalSpec,
) -> &mut SampleBuffer<f32> {
    let needed = frames * spec.channels.count();
    if slot.as_ref().map_or(true, |buf| buf.capacity() < needed) {
        *slot = Some(SampleBuffer::new(frames as u64, spec));
    }
    slot.get_or_insert_with(|| SampleBuffer::new(frames as u64, spec))
}

/// One-line summary of the run parameters, drawn under the plot.
pub fn run_caption(
    signal: &Signal,
    transform: &TransformKind,
    filter: Option<&FilterSpec>,
    demodulate: bool,
) -> String {
    let mut parts = vec![format!("sr {} hz", signal.sample_rate())];
    parts.push(match transform {
        TransformKind::Stft(frames) => format!(
            "stft {} {}/{}",
            frames.window, frames.frame_length, frames.hop_length
        ),
        TransformKind::Mel { frames, n_mels } => format!(
            "mel {n_mels} bands {} {}/{}",
            frames.window, frames.frame_length, frames.hop_length
        ),
        TransformKind::Cwt { scales, wavelet } => match &scales.scales {
            Some(explicit) => format!("cwt {wavelet} {} scales", explicit.len()),
            None => format!(
                "cwt {wavelet} scales {}-{} x{}",
                scales.scale_min, scales.scale_max, scales.scale_count
            ),
        },
    });
    parts.push(match filter.and_then(|f| f.cutoff_hz.map(|hz| (f, hz))) {
        Some((f, hz)) if hz > 0.0 => format!("lowpass {} {hz} hz order {}", f.kind, f.order),
        _ => "no filter".to_string(),
    });
    if demodulate {
        parts.push("envelope".to_string());
    }
    parts.join(", ")
}

pub fn output_path(dir: &Path, prefix: &str, extension: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let base = format!("{prefix}_{stamp}");
    let mut candidate = dir.join(format!("{base}.{extension}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{n}.{extension}"));
        n += 1;
    }
    Ok(candidate)
}

/// Write `signal` as 16-bit mono PCM, scaled so its peak hits full scale.
pub fn export_wav(signal: &Signal, path: &Path) -> Result<()> {
    let peak = signal
        .samples()
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0f64, |m, v| m.max(v.abs()));
    let gain = if peak > 0.0 { i16::MAX as f64 / peak } else { 0.0 };
    let spec = WavSpec {
        channels: 1,
        sample_rate: signal.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for &v in signal.samples() {
        let scaled = if v.is_finite() { (v * gain).round() } else { 0.0 };
        writer.write_sample(scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16)?;
    }
    writer.finalize()?;
    log::info!("wrote {} samples to {}", signal.len(), path.display());
    Ok(())
}

/// Test tone: 440, 880 and 1320 Hz partials plus a 200→500 Hz sweep, peak-normalised.
pub fn test_signal(duration_s: f64, sample_rate: u32) -> Result<Signal> {
    if !(duration_s > 0.0 && duration_s.is_finite()) {
        bail!("duration must be a positive number of seconds");
    }
    let len = (duration_s * sample_rate as f64).round() as usize;
    let tau = 2.0 * std::f64::consts::PI;
    let raw = Signal::from_fn(len, sample_rate, |t| {
        0.3 * (tau * 440.0 * t).sin()
            + 0.2 * (tau * 880.0 * t).sin()
            + 0.1 * (tau * 1320.0 * t).sin()
            + 0.2 * (tau * (200.0 + 300.0 * t / duration_s) * t).sin()
    })?;
    let peak = raw.samples().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if peak == 0.0 {
        return Ok(raw);
    }
    Ok(raw.derive(raw.samples().iter().map(|v| v / peak).collect())?)
}

/// Writes an SVG with one rectangle per horizontal run of equal pixels.
#[derive(Clone, Debug)]
pub struct SvgSink {
    path: PathBuf,
}

impl SvgSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn svg_document(image: &RgbImage) -> svg::Document {
    use svg::node::element::Rectangle;

    let (w, h) = image.dimensions();
    let mut document = svg::Document::new()
        .set("viewBox", (0, 0, w, h))
        .set("width", w)
        .set("height", h)
        .set("shape-rendering", "crispEdges");
    for y in 0..h {
        let mut x = 0;
        while x < w {
            let pixel = *image.get_pixel(x, y);
            let mut run = 1;
            while x + run < w && *image.get_pixel(x + run, y) == pixel {
                run += 1;
            }
            let rect = Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", run)
                .set("height", 1)
                .set(
                    "fill",
                    format!("#{:02x}{:02x}{:02x}", pixel[0], pixel[1], pixel[2]),
                );
            document = document.add(rect);
            x += run;
        }
    }
    document
}

impl ArtifactSink for SvgSink {
    fn write(&mut self, image: &RgbImage) -> tfscope::Result<Artifact> {
        svg::save(&self.path, &svg_document(image))?;
        log::info!("wrote svg to {}", self.path.display());
        Ok(Artifact {
            path: Some(self.path.clone()),
            width: image.width(),
            height: image.height(),
        })
    }
}
