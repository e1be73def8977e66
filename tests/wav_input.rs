use std::f64::consts::PI;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tfscope::frame::FrameSpec;
use tfscope::pipeline::{analyze, AnalysisConfig};
use tfscope::progress::RunControl;
use tfscope::transform::TransformKind;
use tfscope::visual::RenderSpec;
use tfscope::Signal;

/// A 16-bit WAV fixture analyses with its peak at the recorded tone.
#[test]
fn wav_fixture_peak_frequency() {
    let dir = tempfile::tempdir().expect("Invariant: temp dir should be created");
    let path = dir.path().join("tone.wav");
    let spec = WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).expect("Invariant: wav should be created");
    for i in 0..8_000 {
        let t = i as f64 / 8_000.0;
        let v = (2.0 * PI * 1000.0 * t).sin() * 0.5 * i16::MAX as f64;
        writer.write_sample(v as i16).expect("Invariant: sample should be written");
    }
    writer.finalize().expect("Invariant: wav should finalize");

    let mut reader = WavReader::open(&path).expect("Invariant: wav should open");
    let samples: Vec<f64> = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f64 / i16::MAX as f64))
        .collect::<Result<_, _>>()
        .expect("Invariant: samples should decode");
    let signal = Signal::new(samples, reader.spec().sample_rate)
        .expect("Invariant: operation should succeed");

    let config = AnalysisConfig {
        transform: TransformKind::Stft(FrameSpec::new(512, 256)),
        render: RenderSpec {
            width: 200,
            height: 120,
            ..RenderSpec::default()
        },
        ..AnalysisConfig::default()
    };
    let analysis = analyze(&signal, &config, &RunControl::new())
        .expect("Invariant: operation should succeed");
    let mid = analysis.transform.times.len() / 2;
    let peak_row = (0..analysis.decibels.rows())
        .max_by(|&a, &b| analysis.decibels[(a, mid)].total_cmp(&analysis.decibels[(b, mid)]))
        .expect("Invariant: rows are non-empty");
    // 1000 Hz at 8000/512 Hz per bin
    assert_eq!(peak_row, 64);
    assert!((analysis.transform.frequencies[peak_row] - 1000.0).abs() < 1e-9);
}
