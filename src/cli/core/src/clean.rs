/* src/cli/core/src/clean.rs */

// `bertui clean`: removes the production output, the intermediate build
// dir and the dev workspace.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::BertuiConfig;
use crate::dev::DEV_DIR;
use crate::ui;

pub fn run_clean(config: &BertuiConfig, base_dir: &Path) -> Result<()> {
  ui::arrow("cleaning project");
  let mut removed = 0;
  for rel in [config.build.out_dir.as_str(), config.build.build_dir.as_str(), DEV_DIR] {
    if delete_dir_if_exists(&base_dir.join(rel))? {
      removed += 1;
    }
  }
  if removed == 0 {
    ui::detail("nothing to remove");
  }
  ui::ok("clean complete");
  Ok(())
}

fn delete_dir_if_exists(path: &Path) -> Result<bool> {
  if !path.exists() {
    return Ok(false);
  }
  std::fs::remove_dir_all(path).with_context(|| format!("failed to remove {}", path.display()))?;
  ui::detail(&format!("deleted {}", path.display()));
  Ok(true)
}
