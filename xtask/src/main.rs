use clap::{Parser, Subcommand};
#[cfg(not(test))]
use xtask::*;

#[derive(Parser)]
#[command(author, version, about = "Development tasks for tfscope")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Build,
    Test {
        /// Include every workspace member
        #[arg(long)]
        workspace: bool,
    },
    Clippy,
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Format check followed by clippy
    Analyze,
    /// Run one of the demos
    Demo { name: String },
    /// Forward the remaining arguments to the tfscope CLI
    Cli {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[cfg(not(test))]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = detect_config();

    let status = match cli.command {
        Commands::Build => build_command(&cfg).status(),
        Commands::Test { workspace: false } => test_command(&cfg).status(),
        Commands::Test { workspace: true } => test_workspace_command().status(),
        Commands::Clippy => clippy_command().status(),
        Commands::Fmt { check } => fmt_command(check).status(),
        Commands::Analyze => {
            let fmt = fmt_command(true).status()?;
            if !fmt.success() {
                Ok(fmt)
            } else {
                clippy_command().status()
            }
        }
        Commands::Demo { name } => demo_command(&cfg, &name)?.status(),
        Commands::Cli { args } => cli_command(&args).status(),
    }?;

    std::process::exit(status.code().unwrap_or(1));
}
