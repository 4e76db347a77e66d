/* src/cli/compiler/src/error.rs */

use std::path::PathBuf;

use thiserror::Error;

/// Why a server-island page could not be rendered to static HTML.
/// The caller falls back to client rendering for that route.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IslandRejection {
  #[error("no `return (...)` expression found")]
  NoReturnExpression,

  #[error("`return (` has no matching `)` that ends the statement")]
  UnbalancedReturn,

  #[error("calls hook `{name}` before its return expression")]
  HookCall { name: String },

  #[error("imports from `{}`; server islands must use plain <a> tags", crate::ROUTER_SPECIFIER)]
  RouterImport,

  #[error("JSX contains event handler `{name}`")]
  EventHandler { name: String },
}

/// Errors surfaced by the compile pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
  #[error("directory not found: {}", path.display())]
  DirectoryNotFound { path: PathBuf },

  #[error("failed to compile {}: {message}", file.display())]
  Compile { file: PathBuf, message: String },

  #[error("server island rejected: {0}")]
  IslandRejected(#[from] IslandRejection),

  #[error("bundling failed: {message}")]
  BundleFailure { message: String },

  #[error("I/O error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl CompileError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn compile(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Compile { file: file.into(), message: message.into() }
  }

  /// True for errors that abort only the file that raised them.
  pub fn is_file_level(&self) -> bool {
    matches!(self, Self::Compile { .. } | Self::IslandRejected(_))
  }
}
