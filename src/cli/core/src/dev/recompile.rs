/* src/cli/core/src/dev/recompile.rs */

// Whole-project dev recompiles. Each compile writes modules and styles into a
// fresh generation dir; the server switches to it in one step once every
// file succeeded, so it never sees a half-written or mismatched tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use bertui_compiler::paths::to_slash;
use bertui_compiler::{
  CompileOptions, CompileReport, ContentCache, ProjectLayout, Route, Transpiler, compile_project,
};
use tokio::sync::mpsc;

use super::reload::{ReloadHub, ReloadMessage};
use crate::build::css::{combine_styles, compile_scss, stylesheet_sources};
use crate::ui::{self, CYAN, DIM, GREEN, RED, RESET};

pub const DEV_DIR: &str = ".bertui";
pub const DEV_STYLESHEET: &str = "bertui.css";

const GENERATION_PREFIX: &str = "gen-";
const WATCHED_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "css", "scss", "sass"];

#[derive(Debug, Clone, Default)]
struct Published {
  dir: Option<PathBuf>,
  routes: Vec<Route>,
}

/// The generation the dev server reads from, plus the routes it was
/// compiled with. Cheap to clone; all clones see the same value.
#[derive(Debug, Clone, Default)]
pub struct LiveOutput(Arc<RwLock<Published>>);

impl LiveOutput {
  pub fn compiled_dir(&self) -> Option<PathBuf> {
    self.read().dir.as_ref().map(|d| d.join("compiled"))
  }

  pub fn styles_dir(&self) -> Option<PathBuf> {
    self.read().dir.as_ref().map(|d| d.join("styles"))
  }

  pub fn routes(&self) -> Vec<Route> {
    self.read().routes.clone()
  }

  /// Switch readers to `dir`. Returns the generation it replaced.
  pub(super) fn publish(&self, dir: PathBuf, routes: Vec<Route>) -> Option<PathBuf> {
    let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
    guard.routes = routes;
    guard.dir.replace(dir)
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Published> {
    self.0.read().unwrap_or_else(PoisonError::into_inner)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecompileSummary {
  pub files: usize,
  pub routes: usize,
  pub islands: usize,
  pub duration: Duration,
}

pub struct Recompiler {
  project: ProjectLayout,
  dev_dir: PathBuf,
  live: LiveOutput,
  generation: AtomicU64,
  transpiler: Box<dyn Transpiler>,
  env: BTreeMap<String, String>,
  cache: Arc<ContentCache>,
}

fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
  match std::fs::remove_dir_all(dir) {
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

impl Recompiler {
  pub fn new(
    root: &Path,
    transpiler: Box<dyn Transpiler>,
    env: BTreeMap<String, String>,
    cache: Arc<ContentCache>,
  ) -> Self {
    Self {
      project: ProjectLayout::new(root),
      dev_dir: root.join(DEV_DIR),
      live: LiveOutput::default(),
      generation: AtomicU64::new(0),
      transpiler,
      env,
      cache,
    }
  }

  pub fn live(&self) -> &LiveOutput {
    &self.live
  }

  /// Compile the whole project. On any failure the previous generation stays
  /// live, the new one is removed and every diagnostic is returned.
  pub fn compile(&self) -> Result<RecompileSummary, Vec<String>> {
    let started = Instant::now();
    let n = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
    let staging = self.dev_dir.join(format!("{GENERATION_PREFIX}{n}"));

    let report = match self.build_generation(&staging) {
      Ok(report) => report,
      Err(diagnostics) => {
        let _ = remove_dir_if_exists(&staging);
        return Err(diagnostics);
      }
    };

    let summary = RecompileSummary {
      files: report.files,
      routes: report.routes.len(),
      islands: report.islands.len(),
      duration: started.elapsed(),
    };
    let previous = self.live.publish(staging.clone(), report.routes);
    // The replaced generation stays one round so in-flight reads finish.
    self.prune(&[Some(staging.as_path()), previous.as_deref()]);
    Ok(summary)
  }

  fn build_generation(&self, staging: &Path) -> Result<CompileReport, Vec<String>> {
    remove_dir_if_exists(staging).map_err(|e| vec![format!("failed to clean staging dir: {e}")])?;
    let options = CompileOptions { out_dir: staging.join("compiled"), env: self.env.clone() };
    let report = compile_project(&self.project, &options, self.transpiler.as_ref(), &self.cache)
      .map_err(|e| vec![e.to_string()])?;
    if !report.is_success() {
      return Err(report.failures.iter().map(ToString::to_string).collect());
    }
    self.write_styles(&report, staging).map_err(|e| vec![format!("{e:#}")])?;
    Ok(report)
  }

  fn write_styles(&self, report: &CompileReport, staging: &Path) -> anyhow::Result<()> {
    let scss_out = staging.join("scss");
    compile_scss(&self.project.styles_dir(), &scss_out, &self.project.root)?;
    let sources = stylesheet_sources(&self.project.styles_dir(), &scss_out)?;
    let css = combine_styles(&sources, &report.scoped_css())?;
    let styles = staging.join("styles");
    std::fs::create_dir_all(&styles)?;
    std::fs::write(styles.join(DEV_STYLESHEET), css)?;
    Ok(())
  }

  /// Delete every generation dir not in `keep`, including ones left by an
  /// earlier session.
  fn prune(&self, keep: &[Option<&Path>]) {
    let Ok(entries) = std::fs::read_dir(&self.dev_dir) else {
      return;
    };
    for entry in entries.flatten() {
      let path = entry.path();
      let is_generation = entry.file_name().to_string_lossy().starts_with(GENERATION_PREFIX);
      if is_generation && !keep.iter().flatten().any(|k| *k == path.as_path()) {
        let _ = remove_dir_if_exists(&path);
      }
    }
  }
}

/// Handle one batch of changes: announce, recompile, then report the result
/// to the terminal and every reload client. Returns whether it succeeded.
/// Callers await this before reading the next batch, so compiles never
/// overlap and changes made meanwhile queue up for exactly one more run.
async fn recompile_batch(recompiler: &Arc<Recompiler>, hub: &ReloadHub, file: String, extra: usize) -> bool {
  hub.send(ReloadMessage::Recompiling);
  let more = if extra > 0 { format!(" {DIM}(+{extra} more){RESET}") } else { String::new() };
  ui::dev_line(CYAN, &format!("{file}{more} changed, recompiling..."));

  let rc = Arc::clone(recompiler);
  match tokio::task::spawn_blocking(move || rc.compile()).await {
    Ok(Ok(summary)) => {
      ui::dev_line(
        GREEN,
        &format!(
          "recompiled {} files in {}ms {DIM}({} clients){RESET}",
          summary.files,
          summary.duration.as_millis(),
          hub.client_count()
        ),
      );
      hub.send(ReloadMessage::Reload { file });
      true
    }
    Ok(Err(diagnostics)) => {
      for d in &diagnostics {
        ui::dev_line(RED, d);
      }
      ui::dev_line(RED, "keeping previous output");
      hub.send(ReloadMessage::Error { message: diagnostics.join("\n") });
      false
    }
    Err(e) => {
      ui::dev_line(RED, &format!("recompile panicked: {e}"));
      hub.send(ReloadMessage::Error { message: e.to_string() });
      false
    }
  }
}

/// Batch `first` with everything queued behind it and recompile once.
pub async fn process_batch(
  rx: &mut mpsc::Receiver<PathBuf>,
  first: PathBuf,
  recompiler: &Arc<Recompiler>,
  hub: &ReloadHub,
  src_dir: &Path,
  debounce: Duration,
) -> bool {
  let batch = next_batch(rx, first, debounce).await;
  let file = changed_label(src_dir, &batch[0]);
  recompile_batch(recompiler, hub, file, batch.len() - 1).await
}

/// Source changes that warrant a recompile.
pub fn is_relevant(path: &Path) -> bool {
  let hidden = path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('.'));
  let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
  !hidden && WATCHED_EXTENSIONS.contains(&ext)
}

/// Wait out `debounce`, then drain everything queued behind `first`.
/// Events that arrive while a recompile runs end up in the next batch.
pub async fn next_batch(
  rx: &mut mpsc::Receiver<PathBuf>,
  first: PathBuf,
  debounce: Duration,
) -> Vec<PathBuf> {
  tokio::time::sleep(debounce).await;
  let mut batch = vec![first];
  while let Ok(path) = rx.try_recv() {
    if !batch.contains(&path) {
      batch.push(path);
    }
  }
  batch
}

/// Display name for a changed file, relative to `src/`.
pub fn changed_label(src_dir: &Path, path: &Path) -> String {
  to_slash(path.strip_prefix(src_dir).unwrap_or(path))
}
