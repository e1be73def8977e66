use assert_cmd::Command;

fn tfscope() -> Command {
    let mut cmd = Command::cargo_bin("tfscope").expect("Invariant: binary should be built");
    cmd.env_remove("TFSCOPE_OUTPUT_DIR");
    cmd
}

fn files_with_extension(dir: &std::path::Path, ext: &str) -> usize {
    std::fs::read_dir(dir)
        .expect("Invariant: output dir should exist")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == ext))
        .count()
}

/// A generated tone renders to PNG and SVG in the requested directory.
#[test]
fn generate_then_stft() {
    let dir = tempfile::tempdir().expect("Invariant: temp dir should be creatable");
    let wav = dir.path().join("tone.wav");
    tfscope()
        .args(["generate", "--duration", "0.5", "--sample-rate", "8000", "--output"])
        .arg(&wav)
        .assert()
        .success();
    let out = dir.path().join("out");
    let assert = tfscope()
        .arg("stft")
        .arg(&wav)
        .args(["--frame-length", "512", "--hop-length", "128"])
        .args(["--width", "200", "--height", "120", "--svg", "--vmin", "-70"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("saved"));
    assert_eq!(files_with_extension(&out, "png"), 1);
    assert_eq!(files_with_extension(&out, "svg"), 1);
}

/// The output directory can come from the environment.
#[test]
fn output_dir_from_environment() {
    let dir = tempfile::tempdir().expect("Invariant: temp dir should be creatable");
    tfscope()
        .env("TFSCOPE_OUTPUT_DIR", dir.path())
        .args(["generate", "--duration", "0.2", "--sample-rate", "8000"])
        .assert()
        .success();
    assert_eq!(files_with_extension(dir.path(), "wav"), 1);
}

/// Pitch analysis prints a machine-readable summary.
#[test]
fn pitch_json() {
    let dir = tempfile::tempdir().expect("Invariant: temp dir should be creatable");
    let wav = dir.path().join("tone.wav");
    tfscope()
        .args(["generate", "--duration", "1", "--sample-rate", "8000", "--output"])
        .arg(&wav)
        .assert()
        .success();
    let output = tfscope()
        .arg("pitch")
        .arg(&wav)
        .arg("--json")
        .output()
        .expect("Invariant: command should run");
    assert!(output.status.success());
    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Invariant: stdout should be JSON");
    assert!(summary["track"].is_array());
    assert_eq!(summary["frame_length"], 2048);
}

/// Unknown variant names fail with a message naming them.
#[test]
fn bad_colormap_fails() {
    let dir = tempfile::tempdir().expect("Invariant: temp dir should be creatable");
    let wav = dir.path().join("tone.wav");
    tfscope()
        .args(["generate", "--duration", "0.2", "--sample-rate", "8000", "--output"])
        .arg(&wav)
        .assert()
        .success();
    let output = tfscope()
        .arg("stft")
        .arg(&wav)
        .args(["--colormap", "sepia", "--output-dir"])
        .arg(dir.path())
        .output()
        .expect("Invariant: command should run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("sepia"));
}
