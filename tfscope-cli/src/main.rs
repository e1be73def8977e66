use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use indicatif::ProgressBar;
use tfscope::pipeline::{analyze, condition as condition_signal, Analysis, AnalysisConfig};
use tfscope::pitch::{analyze_pitch_with, describe_range, PitchSummary};
use tfscope::progress::{Progress, RunControl};
use tfscope::transform::TransformKind;
use tfscope::visual::PngSink;
use tfscope::{Advisory, Signal};
use tfscope_cli::config::RunConfig;
use tfscope_cli::{
    export_wav, load_signal, output_path, run_caption, test_signal, InputFormat, SvgSink,
};

/// Render spectrograms and scalograms of recorded signals.
#[derive(Parser)]
#[command(name = "tfscope", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file with default settings; flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Short-time Fourier transform spectrogram
    Stft {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        condition: ConditionArgs,
        #[command(flatten)]
        frames: FrameArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Continuous wavelet transform scalogram
    Cwt {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        condition: ConditionArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Wavelet family: morl, mexh, gaus1..gaus8, cgau1..cgau8, cmorB-C
        #[arg(long)]
        wavelet: Option<String>,
        #[arg(long)]
        scale_min: Option<f64>,
        #[arg(long)]
        scale_max: Option<f64>,
        #[arg(long)]
        scale_count: Option<usize>,
    },
    /// Mel-band spectrogram
    Mel {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        condition: ConditionArgs,
        #[command(flatten)]
        frames: FrameArgs,
        #[command(flatten)]
        render: RenderArgs,
        /// Number of mel bands
        #[arg(long)]
        n_mels: Option<usize>,
    },
    /// Fundamental-frequency statistics
    Pitch {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        condition: ConditionArgs,
        #[arg(long)]
        fmin: Option<f64>,
        #[arg(long)]
        fmax: Option<f64>,
        #[arg(long)]
        frame_length: Option<usize>,
        #[arg(long)]
        hop_length: Option<usize>,
        /// YIN dip threshold in (0, 1)
        #[arg(long)]
        threshold: Option<f64>,
        /// Print the full summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a multi-tone test WAV
    Generate {
        /// Destination; defaults to a timestamped file in the output directory
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 3.0)]
        duration: f64,
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InputArgs {
    /// CSV, text or audio file
    input: PathBuf,
    /// Override format detection by extension
    #[arg(long, value_enum)]
    format: Option<InputFormat>,
    /// CSV column to analyse
    #[arg(long)]
    channel: Option<String>,
    /// Sample rate in Hz (CSV header and text defaults are used otherwise)
    #[arg(long)]
    sample_rate: Option<u32>,
}

#[derive(Args)]
struct ConditionArgs {
    /// Lowpass cutoff in Hz; omit to skip filtering
    #[arg(long)]
    cutoff: Option<f64>,
    #[arg(long)]
    filter_order: Option<usize>,
    /// butter or cheby1[:ripple_db]
    #[arg(long)]
    filter_kind: Option<String>,
    /// Analyse the Hilbert envelope instead of the raw signal
    #[arg(long, overrides_with = "no_demodulate")]
    demodulate: bool,
    /// Analyse the raw signal even if the config file demodulates
    #[arg(long, overrides_with = "demodulate")]
    no_demodulate: bool,
    /// Also save the conditioned signal as a WAV file
    #[arg(long, overrides_with = "no_export_wav")]
    export_wav: bool,
    #[arg(long, overrides_with = "export_wav")]
    no_export_wav: bool,
}

#[derive(Args)]
struct FrameArgs {
    #[arg(long)]
    frame_length: Option<usize>,
    #[arg(long)]
    hop_length: Option<usize>,
    #[arg(long)]
    fft_length: Option<usize>,
    /// hann, hamming, blackman, bartlett, rectangular, kaiser[:beta], tukey[:alpha]
    #[arg(long)]
    window: Option<String>,
    /// Add a zero-padded final frame covering the signal tail
    #[arg(long, overrides_with = "no_pad_tail")]
    pad_tail: bool,
    #[arg(long, overrides_with = "pad_tail")]
    no_pad_tail: bool,
}

#[derive(Args)]
struct RenderArgs {
    /// Lowest displayed level in dB
    #[arg(long, allow_hyphen_values = true)]
    vmin: Option<f64>,
    /// Highest displayed frequency in Hz
    #[arg(long)]
    ceiling: Option<f64>,
    /// jet, viridis, plasma, inferno, magma, gray, fire
    #[arg(long)]
    colormap: Option<String>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Space the frequency axis evenly in mel
    #[arg(long, overrides_with = "no_mel_axis")]
    mel_axis: bool,
    /// Keep a linear frequency axis
    #[arg(long, overrides_with = "mel_axis")]
    no_mel_axis: bool,
    /// Also write an SVG next to the PNG
    #[arg(long, overrides_with = "no_svg")]
    svg: bool,
    #[arg(long, overrides_with = "svg")]
    no_svg: bool,
    /// Heading drawn above the plot; defaults to the transform and input name
    #[arg(long)]
    title: Option<String>,
    /// Directory for generated files [env: TFSCOPE_OUTPUT_DIR]
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

/// `--x` sets a boolean, `--no-x` clears it, neither leaves lower layers alone.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl InputArgs {
    fn layer(&self, cfg: &mut RunConfig) {
        cfg.channel = self.channel.clone();
        cfg.sample_rate = self.sample_rate;
    }
}

impl ConditionArgs {
    fn layer(&self, cfg: &mut RunConfig) {
        cfg.cutoff_hz = self.cutoff;
        cfg.filter_order = self.filter_order;
        cfg.filter_kind = self.filter_kind.clone();
        cfg.demodulate = toggle(self.demodulate, self.no_demodulate);
        cfg.export_wav = toggle(self.export_wav, self.no_export_wav);
    }
}

impl FrameArgs {
    fn layer(&self, cfg: &mut RunConfig) {
        cfg.frame_length = self.frame_length;
        cfg.hop_length = self.hop_length;
        cfg.fft_length = self.fft_length;
        cfg.window = self.window.clone();
        cfg.pad_tail = toggle(self.pad_tail, self.no_pad_tail);
    }
}

impl RenderArgs {
    fn layer(&self, cfg: &mut RunConfig) {
        cfg.vmin = self.vmin;
        cfg.frequency_ceiling = self.ceiling;
        cfg.colormap = self.colormap.clone();
        cfg.width = self.width;
        cfg.height = self.height;
        cfg.mel_axis = toggle(self.mel_axis, self.no_mel_axis);
        cfg.svg = toggle(self.svg, self.no_svg);
        cfg.title = self.title.clone();
        cfg.output_dir = self.output_dir.clone();
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Progress bar driven by the core progress callback.
fn progress_control() -> (RunControl, ProgressBar) {
    let bar = ProgressBar::new(0);
    let handle = bar.clone();
    let control = RunControl::new().with_progress(move |p: Progress| {
        handle.set_length(p.total as u64);
        handle.set_position(p.done as u64);
        handle.set_message(p.stage.to_string());
    });
    (control, bar)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("signal")
        .to_string()
}

fn prefix(input: &Path, cfg: &RunConfig, kind: &str) -> String {
    if cfg.demodulate.unwrap_or(false) {
        format!("demodulated_{}_{kind}", file_stem(input))
    } else {
        format!("{}_{kind}", file_stem(input))
    }
}

fn save_analysis(analysis: &Analysis, input: &Path, cfg: &RunConfig, kind: &str) -> Result<()> {
    let dir = cfg.output_dir();
    let prefix = prefix(input, cfg, kind);
    let png = output_path(&dir, &prefix, "png")
        .with_context(|| format!("preparing {}", dir.display()))?;
    analysis.save(&mut PngSink::new(&png))?;
    println!("saved {}", png.display());
    if cfg.svg.unwrap_or(false) {
        let svg = output_path(&dir, &prefix, "svg")?;
        analysis.save(&mut SvgSink::new(&svg))?;
        println!("saved {}", svg.display());
    }
    if cfg.export_wav.unwrap_or(false) {
        export_conditioned(&analysis.signal, input, cfg)?;
    }
    for advisory in &analysis.advisories {
        println!("note: {advisory}");
    }
    Ok(())
}

fn export_conditioned(signal: &Signal, input: &Path, cfg: &RunConfig) -> Result<()> {
    let dir = cfg.output_dir();
    let wav = output_path(&dir, &prefix(input, cfg, "signal"), "wav")?;
    export_wav(signal, &wav)?;
    println!("saved {}", wav.display());
    Ok(())
}

fn run_transform(
    input: &InputArgs,
    cfg: &RunConfig,
    transform: TransformKind,
    mel_axis: bool,
) -> Result<()> {
    let signal = load_signal(&input.input, input.format, cfg.channel(), cfg.sample_rate)?;
    let filter = cfg.filter_spec()?;
    let demodulate = cfg.demodulate.unwrap_or(false);
    let mut render = cfg.render_spec(mel_axis)?;
    render.title = Some(render.title.take().unwrap_or_else(|| {
        let name = input.input.file_name().unwrap_or(input.input.as_os_str());
        format!("{} {}", transform.name(), name.to_string_lossy())
    }));
    render.caption = Some(run_caption(&signal, &transform, filter.as_ref(), demodulate));
    let config = AnalysisConfig {
        filter,
        demodulate,
        render,
        transform,
    };
    let kind = config.transform.name();
    let (control, bar) = progress_control();
    let analysis = analyze(&signal, &config, &control);
    bar.finish_and_clear();
    let analysis = analysis.with_context(|| format!("{kind} analysis of {}", input.input.display()))?;
    save_analysis(&analysis, &input.input, cfg, kind)
}

fn print_pitch(summary: &PitchSummary) {
    println!(
        "frames: {} (frame length {}, hop {})",
        summary.track.len(),
        summary.frame_length,
        summary.hop_length
    );
    println!("voiced: {:.1}%", summary.voiced_percentage);
    match &summary.stats {
        Some(s) => {
            println!("f0 min:    {:.2} Hz", s.min);
            println!("f0 max:    {:.2} Hz", s.max);
            println!("f0 mean:   {:.2} Hz", s.mean);
            println!("f0 median: {:.2} Hz", s.median);
            println!("f0 std:    {:.2} Hz", s.std);
            println!("range: {}", describe_range(s.min, s.max));
        }
        None => println!("no pitch detected; try widening --fmin/--fmax"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let file = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    let mut flags = RunConfig::default();

    match cli.command {
        Command::Stft {
            input,
            condition,
            frames,
            render,
        } => {
            input.layer(&mut flags);
            condition.layer(&mut flags);
            frames.layer(&mut flags);
            render.layer(&mut flags);
            let cfg = file.overlay(flags);
            run_transform(&input, &cfg, TransformKind::Stft(cfg.frame_spec()?), false)
        }
        Command::Cwt {
            input,
            condition,
            render,
            wavelet,
            scale_min,
            scale_max,
            scale_count,
        } => {
            input.layer(&mut flags);
            condition.layer(&mut flags);
            render.layer(&mut flags);
            flags.wavelet = wavelet;
            flags.scale_min = scale_min;
            flags.scale_max = scale_max;
            flags.scale_count = scale_count;
            let cfg = file.overlay(flags);
            let transform = TransformKind::Cwt {
                scales: cfg.scale_spec(),
                wavelet: cfg.wavelet()?,
            };
            run_transform(&input, &cfg, transform, false)
        }
        Command::Mel {
            input,
            condition,
            frames,
            render,
            n_mels,
        } => {
            input.layer(&mut flags);
            condition.layer(&mut flags);
            frames.layer(&mut flags);
            render.layer(&mut flags);
            flags.n_mels = n_mels;
            let cfg = file.overlay(flags);
            let transform = TransformKind::Mel {
                frames: cfg.frame_spec()?,
                n_mels: cfg.n_mels(),
            };
            run_transform(&input, &cfg, transform, true)
        }
        Command::Pitch {
            input,
            condition,
            fmin,
            fmax,
            frame_length,
            hop_length,
            threshold,
            json,
        } => {
            input.layer(&mut flags);
            condition.layer(&mut flags);
            flags.fmin = fmin;
            flags.fmax = fmax;
            flags.frame_length = frame_length;
            flags.hop_length = hop_length;
            flags.threshold = threshold;
            let cfg = file.overlay(flags);
            let signal = load_signal(&input.input, input.format, cfg.channel(), cfg.sample_rate)?;
            let (conditioned, advisories) = condition_signal(
                &signal,
                cfg.filter_spec()?.as_ref(),
                cfg.demodulate.unwrap_or(false),
            )?;
            if cfg.export_wav.unwrap_or(false) {
                export_conditioned(&conditioned, &input.input, &cfg)?;
            }
            let (control, bar) = progress_control();
            let outcome = analyze_pitch_with(&conditioned, &cfg.pitch_spec()?, &control);
            bar.finish_and_clear();
            let (summary, advisory) = outcome?.into_parts();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_pitch(&summary);
            }
            let hidden = match advisory {
                Some(Advisory::NoPitchDetected) => summary.frame_enlarged(),
                _ => None,
            };
            for note in advisories.iter().chain(&hidden).chain(advisory.as_ref()) {
                if json {
                    eprintln!("note: {note}");
                } else {
                    println!("note: {note}");
                }
            }
            Ok(())
        }
        Command::Generate {
            output,
            duration,
            sample_rate,
            output_dir,
        } => {
            flags.output_dir = output_dir;
            let cfg = file.overlay(flags);
            let signal = test_signal(duration, sample_rate)?;
            let path = match output {
                Some(path) => path,
                None => output_path(&cfg.output_dir(), "test_audio", "wav")?,
            };
            export_wav(&signal, &path)?;
            println!("saved {}", path.display());
            println!(
                "{:.2} s at {} Hz: 440, 880 and 1320 Hz tones plus a 200-500 Hz sweep",
                duration, sample_rate
            );
            Ok(())
        }
    }
}
