/* src/cli/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::BertuiConfig;

pub const CONFIG_FILE: &str = "bertui.toml";

/// Walk upward from `start` to find `bertui.toml`, like Cargo.toml discovery.
/// `Ok(None)` when no ancestor has one.
pub fn find_bertui_config(start: &Path) -> Result<Option<PathBuf>> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join(CONFIG_FILE);
    if candidate.is_file() {
      return Ok(Some(candidate));
    }
    if !dir.pop() {
      return Ok(None);
    }
  }
}

pub fn load_bertui_config(path: &Path) -> Result<BertuiConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  parse_bertui_config(&content).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_bertui_config(content: &str) -> Result<BertuiConfig> {
  let config: BertuiConfig = toml::from_str(content)?;
  config.validate()?;
  Ok(config)
}

/// Project root and config: explicit path, else upward discovery from `cwd`,
/// else `cwd` with defaults.
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<(PathBuf, BertuiConfig)> {
  let path = match explicit {
    Some(p) => Some(p.to_path_buf()),
    None => find_bertui_config(cwd)?,
  };
  match path {
    Some(path) => {
      let config = load_bertui_config(&path)?;
      let base_dir = path.parent().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
      Ok((base_dir, config))
    }
    None => Ok((cwd.to_path_buf(), BertuiConfig::default())),
  }
}
