use std::env;
use std::process::Command;

/// Demos shipped with the library, runnable through `cargo xtask demo <name>`.
pub const DEMOS: [&str; 3] = ["two_tone", "scalogram", "verbose_logging"];

/// Options derived from the host machine used to configure cargo commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub features: Vec<String>,
}

impl BuildConfig {
    /// Join features into a single string suitable for passing to cargo.
    pub fn features_arg(&self) -> Option<String> {
        if self.features.is_empty() {
            None
        } else {
            Some(self.features.join(" "))
        }
    }

    fn apply(&self, cmd: &mut Command) {
        if let Some(f) = self.features_arg() {
            cmd.arg("--features").arg(f);
        }
    }
}

/// Detect build configuration from the current machine and `TFSCOPE_FEATURES`.
pub fn detect_config() -> BuildConfig {
    let extra = env::var("TFSCOPE_FEATURES").unwrap_or_default();
    compute_config(detect_nproc(), &extra)
}

fn detect_nproc() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Compute a [`BuildConfig`] from supplied inputs. This is separated for testing.
pub fn compute_config(nproc: usize, extra: &str) -> BuildConfig {
    let mut features: Vec<String> = Vec::new();
    if nproc > 1 {
        features.push("parallel".into());
    }
    for feat in extra.split_whitespace() {
        if !features.iter().any(|f| f == feat) {
            features.push(feat.to_string());
        }
    }
    BuildConfig { features }
}

pub fn build_command(cfg: &BuildConfig) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["build", "--workspace"]);
    cfg.apply(&mut cmd);
    cmd
}

pub fn test_command(cfg: &BuildConfig) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.arg("test");
    cfg.apply(&mut cmd);
    cmd
}

/// Tests of every workspace member, CLI included.
pub fn test_workspace_command() -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["test", "--workspace"]);
    cmd
}

pub fn clippy_command() -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args([
        "clippy",
        "--workspace",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
    cmd
}

pub fn fmt_command(check: bool) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["fmt", "--all"]);
    if check {
        cmd.args(["--", "--check"]);
    }
    cmd
}

pub fn demo_command(cfg: &BuildConfig, name: &str) -> anyhow::Result<Command> {
    if !DEMOS.contains(&name) {
        anyhow::bail!("unknown demo `{name}`; expected one of {}", DEMOS.join(", "));
    }
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "--release", "--example", name]);
    cfg.apply(&mut cmd);
    Ok(cmd)
}

/// Run the CLI in release mode with the given arguments.
pub fn cli_command(args: &[String]) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "-r", "-p", "tfscope-cli", "--"]);
    cmd.args(args);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_compute_parallel_and_extra() {
        let cfg = compute_config(4, "serde parallel");
        assert_eq!(cfg.features, vec!["parallel".to_string(), "serde".to_string()]);
        assert_eq!(cfg.features_arg().as_deref(), Some("parallel serde"));
    }

    #[test]
    fn test_compute_single_core() {
        let cfg = compute_config(1, "");
        assert!(cfg.features.is_empty());
        assert!(cfg.features_arg().is_none());
    }

    #[test]
    fn test_commands_include_features() {
        let cfg = compute_config(2, "serde");
        let build = args(&build_command(&cfg));
        assert!(build.contains(&"build".to_string()));
        assert!(build.contains(&"--features".to_string()));
        assert!(build.iter().any(|a| a.contains("serde")));
        assert!(args(&test_command(&cfg)).contains(&"test".to_string()));
    }

    #[test]
    fn test_other_commands() {
        assert!(args(&clippy_command()).contains(&"warnings".to_string()));
        assert!(args(&fmt_command(true)).contains(&"--check".to_string()));
        assert!(!args(&fmt_command(false)).contains(&"--check".to_string()));
        assert!(args(&test_workspace_command()).contains(&"--workspace".to_string()));
        let cli = args(&cli_command(&["stft".into(), "in.wav".into()]));
        assert!(cli.contains(&"tfscope-cli".to_string()));
        assert!(cli.ends_with(&["stft".to_string(), "in.wav".to_string()]));
    }

    #[test]
    fn test_demo_names_are_checked() {
        let cfg = compute_config(1, "");
        let demo = demo_command(&cfg, "two_tone").expect("known demo");
        assert!(args(&demo).contains(&"two_tone".to_string()));
        assert!(demo_command(&cfg, "benchmark").is_err());
    }
}
