//! Morlet scalogram of a tone burst that jumps from 250 Hz to 1 kHz.

use std::f64::consts::PI;

use tfscope::prelude::*;
use tfscope::wavelet::scale_to_frequency;

fn main() -> Result<()> {
    let sr = 8_000;
    let signal = Signal::from_fn(sr as usize, sr, |t| {
        let hz = if t < 0.5 { 250.0 } else { 1000.0 };
        (2.0 * PI * hz * t).sin()
    })?;

    let scales = ScaleSpec::new(2.0, 64.0, 128);
    let wavelet = WaveletKind::Morlet;
    let freqs = scale_to_frequency(wavelet, &scales.resolve()?, sr);
    println!(
        "scales 2..64 cover {:.0} Hz down to {:.0} Hz",
        freqs[0],
        freqs[freqs.len() - 1]
    );

    let config = AnalysisConfig {
        transform: TransformKind::Cwt { scales, wavelet },
        render: RenderSpec {
            frequency_ceiling: 2000.0,
            colormap: Colormap::Viridis,
            ..RenderSpec::default()
        },
        ..AnalysisConfig::default()
    };
    let control = RunControl::new().with_progress(|p| {
        if p.done == p.total {
            println!("{}: {} rows", p.stage, p.total);
        }
    });
    let analysis = analyze(&signal, &config, &control)?;
    let artifact = analysis.save(&mut PngSink::new("scalogram.png"))?;
    println!("wrote {}x{} scalogram.png", artifact.width, artifact.height);
    Ok(())
}
