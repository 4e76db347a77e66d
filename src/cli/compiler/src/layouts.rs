/* src/cli/compiler/src/layouts.rs */

// `src/layouts/default.jsx` wraps every page; `src/layouts/blog.jsx`
// wraps pages under `/blog`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::CompileError;
use crate::routes::PAGE_EXTENSIONS;

pub const DEFAULT_LAYOUT: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
  pub name: String,
  /// File name inside the layouts directory.
  pub source_file: PathBuf,
  /// `*` for the default layout, `/<name>` otherwise.
  pub route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutSet {
  layouts: BTreeMap<String, Layout>,
}

impl LayoutSet {
  pub fn is_empty(&self) -> bool {
    self.layouts.is_empty()
  }

  pub fn len(&self) -> usize {
    self.layouts.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Layout> {
    self.layouts.values()
  }

  pub fn insert(&mut self, layout: Layout) {
    self.layouts.insert(layout.name.clone(), layout);
  }

  /// Layout named after the first path segment, else `default`.
  pub fn match_layout(&self, route_path: &str) -> Option<&Layout> {
    let segment = route_path.trim_start_matches('/').split('/').next().unwrap_or_default();
    (!segment.is_empty())
      .then(|| self.layouts.get(segment))
      .flatten()
      .or_else(|| self.layouts.get(DEFAULT_LAYOUT))
  }
}

/// Scan the layouts directory (non-recursive). A missing directory means
/// no layouts.
pub fn discover_layouts(layouts_dir: &Path) -> Result<LayoutSet, CompileError> {
  let mut set = LayoutSet::default();
  if !layouts_dir.is_dir() {
    return Ok(set);
  }
  let entries = std::fs::read_dir(layouts_dir).map_err(|e| CompileError::io(layouts_dir, e))?;
  for entry in entries {
    let entry = entry.map_err(|e| CompileError::io(layouts_dir, e))?;
    let path = entry.path();
    if !path.is_file() {
      continue;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if !PAGE_EXTENSIONS.contains(&ext) {
      continue;
    }
    let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
      continue;
    };
    let route = if name == DEFAULT_LAYOUT { "*".to_string() } else { format!("/{name}") };
    set.insert(Layout { source_file: PathBuf::from(entry.file_name()), route, name });
  }
  Ok(set)
}
