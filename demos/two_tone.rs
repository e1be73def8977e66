//! Spectrogram of a 440 Hz + 880 Hz tone, with and without a 600 Hz lowpass.

use std::f64::consts::PI;

use tfscope::prelude::*;

fn main() -> Result<()> {
    let sr = 48_000;
    let signal = Signal::from_fn(2 * sr as usize, sr, |t| {
        (2.0 * PI * 440.0 * t).sin() + (2.0 * PI * 880.0 * t).sin()
    })?;

    let mut config = AnalysisConfig {
        transform: TransformKind::Stft(FrameSpec::new(2048, 512)),
        render: RenderSpec {
            frequency_ceiling: 2000.0,
            ..RenderSpec::default()
        },
        ..AnalysisConfig::default()
    };
    let raw = analyze(&signal, &config, &RunControl::default())?;
    raw.save(&mut PngSink::new("two_tone.png"))?;

    config.filter = Some(FilterSpec::lowpass(600.0, 4));
    let filtered = analyze(&signal, &config, &RunControl::default())?;
    filtered.save(&mut PngSink::new("two_tone_lowpass.png"))?;

    let bin = |hz: f64| (hz * 2048.0 / sr as f64).round() as usize;
    let mid = raw.transform.times.len() / 2;
    for hz in [440.0, 880.0] {
        let before = raw.transform.coefficients[(bin(hz), mid)].norm_sqr();
        let after = filtered.transform.coefficients[(bin(hz), mid)].norm_sqr();
        println!(
            "{hz} Hz: {:+.1} dB after lowpass",
            10.0 * (after / before).log10()
        );
    }
    println!("wrote two_tone.png and two_tone_lowpass.png");
    Ok(())
}
