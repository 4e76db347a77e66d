/* src/cli/core/src/main.rs */

mod analyze;
mod build;
mod clean;
mod config;
mod dev;
mod serve;
mod server;
mod shell;
mod transpile;
mod ui;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::{BertuiConfig, resolve_config};

#[derive(Parser)]
#[command(name = "bertui", about = "BertUI CLI")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Start the dev server with live reload
  Dev {
    /// Path to bertui.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Port to listen on (falls back to the next free port)
    #[arg(short, long)]
    port: Option<u16>,
  },
  /// Build the production site into the output directory
  Build {
    /// Path to bertui.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
  /// Preview a production build
  #[command(alias = "preview")]
  Serve {
    /// Path to bertui.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory to serve, relative to the project root
    #[arg(short, long)]
    dir: Option<String>,
  },
  /// Write a size report for the built assets
  Analyze {
    /// Path to bertui.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Open the report in the browser
    #[arg(long)]
    open: bool,
  },
  /// Remove build output and the dev workspace
  Clean {
    /// Path to bertui.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
}

/// Warn if `.bertui/` is not covered by any gitignore rule
fn warn_dev_dir_not_gitignored(base_dir: &Path) {
  use std::process::Command;
  let output =
    Command::new("git").args(["check-ignore", "-q", dev::DEV_DIR]).current_dir(base_dir).output();
  // exit 1 = not ignored; 0 = ignored, other = not a git repo or git missing
  if let Ok(o) = output
    && o.status.code() == Some(1)
  {
    ui::warn(".bertui/ is not in .gitignore -- consider adding it to avoid tracking dev artifacts");
  }
}

fn load(explicit: Option<&Path>) -> Result<(PathBuf, BertuiConfig)> {
  let cwd = std::env::current_dir().context("failed to get cwd")?;
  resolve_config(explicit, &cwd)
}

async fn run(command: Command) -> Result<ExitCode> {
  match command {
    Command::Dev { config, port } => {
      let (base_dir, config) = load(config.as_deref())?;
      warn_dev_dir_not_gitignored(&base_dir);
      dev::run_dev(&config, &base_dir, port).await?;
    }
    Command::Build { config } => {
      let (base_dir, config) = load(config.as_deref())?;
      return Ok(build::run_build(&config, &base_dir).exit_code());
    }
    Command::Serve { config, port, dir } => {
      let (base_dir, config) = load(config.as_deref())?;
      serve::run_serve(&config, &base_dir, port, dir.as_deref()).await?;
    }
    Command::Analyze { config, open } => {
      let (base_dir, config) = load(config.as_deref())?;
      analyze::run_analyze(&config, &base_dir, open)?;
    }
    Command::Clean { config } => {
      let (base_dir, config) = load(config.as_deref())?;
      clean::run_clean(&config, &base_dir)?;
    }
  }
  Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
  let cli = Cli::parse();
  match run(cli.command).await {
    Ok(code) => code,
    Err(e) => {
      ui::fail(&format!("{e:#}"));
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preview_is_an_alias_of_serve() {
    let cli = Cli::try_parse_from(["bertui", "preview", "--port", "4000"]).unwrap();
    assert!(matches!(cli.command, Command::Serve { port: Some(4000), .. }));
  }

  #[test]
  fn analyze_accepts_open() {
    let cli = Cli::try_parse_from(["bertui", "analyze", "--open"]).unwrap();
    assert!(matches!(cli.command, Command::Analyze { open: true, config: None }));
  }

  #[test]
  fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["bertui", "deploy"]).is_err());
  }
}
