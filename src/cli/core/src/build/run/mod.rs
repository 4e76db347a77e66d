/* src/cli/core/src/build/run/mod.rs */

// Build orchestrator: clean, run the 8 pipeline steps, always clean up the
// intermediate build dir, and report success or the collected diagnostics.

mod pipeline;


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bertui_compiler::env::load_env_variables;
use bertui_compiler::{ContentCache, Transpiler};

use super::bundle::{Bundler, CommandBundler};
use super::css::{CssTransformer, LightningCss};
use super::types::{BuildResult, Diagnostics};
use crate::config::BertuiConfig;
use crate::transpile::CommandTranspiler;
use crate::ui;

/// External tools a build delegates to.
pub struct Toolchain<'a> {
  pub transpiler: &'a dyn Transpiler,
  pub bundler: &'a dyn Bundler,
  pub css: &'a dyn CssTransformer,
}

/// Directories one build reads and writes, resolved against the project root.
#[derive(Debug, Clone)]
pub(crate) struct BuildDirs {
  pub root: PathBuf,
  pub build: PathBuf,
  pub out: PathBuf,
}

impl BuildDirs {
  fn new(config: &BertuiConfig, base_dir: &Path) -> Self {
    Self {
      root: base_dir.to_path_buf(),
      build: base_dir.join(&config.build.build_dir),
      out: base_dir.join(&config.build.out_dir),
    }
  }
}

pub fn run_build(config: &BertuiConfig, base_dir: &Path) -> BuildResult {
  let transpiler = CommandTranspiler::new(base_dir, config.build.transpiler_command.as_deref());
  if let Err(e) = transpiler.check_available() {
    ui::fail(&format!("{e:#}"));
    return BuildResult::Failure { diagnostics: vec![format!("{e:#}")] };
  }
  let bundler = CommandBundler::new(config.build.bundler_command.as_deref());
  let css = LightningCss { minify: config.build.minify };
  let toolchain = Toolchain { transpiler: &transpiler, bundler: &bundler, css: &css };
  let env = load_env_variables(std::env::vars(), &config.env.prefixes);
  run_build_with(config, base_dir, &toolchain, env)
}

/// Build with explicit tools and environment.
pub fn run_build_with(
  config: &BertuiConfig,
  base_dir: &Path,
  toolchain: &Toolchain<'_>,
  env: BTreeMap<String, String>,
) -> BuildResult {
  ui::banner("build", Some(config.project_name()));

  let dirs = BuildDirs::new(config, base_dir);
  let cache = ContentCache::default();
  let result = prepare_dirs(&dirs)
    .and_then(|()| pipeline::run(config, &dirs, toolchain, &env, &cache));

  if config.build.clean_build_dir
    && let Err(e) = remove_dir_if_exists(&dirs.build)
  {
    ui::warn(&format!("failed to remove {}: {e}", dirs.build.display()));
  }
  cache.dispose();

  match result {
    Ok(summary) => {
      pipeline::print_summary(&summary, &dirs);
      BuildResult::Success(summary)
    }
    Err(Diagnostics(diagnostics)) => {
      ui::blank();
      for d in &diagnostics {
        ui::fail(d);
      }
      ui::fail("build failed");
      BuildResult::Failure { diagnostics }
    }
  }
}

fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
  match std::fs::remove_dir_all(dir) {
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    other => other,
  }
}

// [0] Remove stale output so nothing from a previous build survives.
fn prepare_dirs(dirs: &BuildDirs) -> Result<(), Diagnostics> {
  for dir in [&dirs.build, &dirs.out] {
    remove_dir_if_exists(dir)
      .map_err(|e| Diagnostics(vec![format!("failed to clean {}: {e}", dir.display())]))?;
    std::fs::create_dir_all(dir)
      .map_err(|e| Diagnostics(vec![format!("failed to create {}: {e}", dir.display())]))?;
  }
  Ok(())
}
