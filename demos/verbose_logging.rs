//! Demodulate an AM signal with debug logging enabled.
//!
//! Run with `RUST_LOG=debug` to see every stage's parameters.

use std::f64::consts::PI;

use tfscope::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let sr = 100_000;
    // 10 kHz carrier, 300 Hz message
    let signal = Signal::from_fn(sr as usize, sr, |t| {
        (1.0 + 0.5 * (2.0 * PI * 300.0 * t).sin()) * (2.0 * PI * 10_000.0 * t).sin()
    })?;

    let config = AnalysisConfig {
        filter: Some(FilterSpec::lowpass(20_000.0, 4)),
        demodulate: true,
        transform: TransformKind::Stft(FrameSpec::new(8192, 2048)),
        render: RenderSpec {
            frequency_ceiling: 1000.0,
            vmin: -60.0,
            ..RenderSpec::default()
        },
    };
    let analysis = analyze(&signal, &config, &RunControl::default())?;
    for advisory in &analysis.advisories {
        log::warn!("{advisory}");
    }
    analysis.save(&mut PngSink::new("demodulated.png"))?;

    let pitch = analyze_pitch(&analysis.signal, &PitchSpec::default())?;
    if let Some(stats) = pitch.value().stats {
        log::info!("envelope pitch median {:.1} Hz", stats.median);
    }
    Ok(())
}
