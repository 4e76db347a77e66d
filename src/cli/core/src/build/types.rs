/* src/cli/core/src/build/types.rs */

// Shared types for the build pipeline.

use std::process::ExitCode;
use std::time::Duration;

use bertui_compiler::{CacheStats, CompileError, HydrationReport};

#[derive(Debug, Clone)]
pub struct OutputFile {
  /// Path relative to the output directory, forward slashes.
  pub path: String,
  pub size: u64,
}

#[derive(Debug)]
pub struct BuildSummary {
  pub routes: usize,
  pub islands: usize,
  pub client_routes: usize,
  pub pages: usize,
  pub duration: Duration,
  pub cache: CacheStats,
  pub hydration: HydrationReport,
  pub bundle: Vec<OutputFile>,
}

/// Outcome of `bertui build`; the caller maps it to a process exit code.
#[derive(Debug)]
pub enum BuildResult {
  Success(BuildSummary),
  Failure { diagnostics: Vec<String> },
}

impl BuildResult {
  pub fn is_success(&self) -> bool {
    matches!(self, Self::Success(_))
  }

  pub fn exit_code(&self) -> ExitCode {
    if self.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
  }
}

/// Every diagnostic collected before a build step gave up.
#[derive(Debug, Default)]
pub struct Diagnostics(pub Vec<String>);

impl From<anyhow::Error> for Diagnostics {
  fn from(e: anyhow::Error) -> Self {
    Self(vec![format!("{e:#}")])
  }
}

impl From<CompileError> for Diagnostics {
  fn from(e: CompileError) -> Self {
    Self(vec![e.to_string()])
  }
}
