/* src/cli/compiler/src/loading.rs */

// Per-route loading states (`pages/**/loading.jsx`) and the app-shell
// loading screen injected into generated HTML.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::CompileError;
use crate::paths::to_slash;
use crate::routes::{PAGE_EXTENSIONS, normalize_route_path};

pub const LOADING_FILE_STEM: &str = "loading";

pub const DEFAULT_LOADING_TEXT: &str = "Loading...";
pub const DEFAULT_LOADING_COLOR: &str = "#10b981";

const LOADING_SCREEN_TEMPLATE: &str = r#"<div id="bertui-loading" style="position: fixed; inset: 0; background: rgba(255,255,255,0.95); display: flex; flex-direction: column; align-items: center; justify-content: center; z-index: 99999; font-family: system-ui, sans-serif; transition: opacity 0.2s ease;">
  <div style="width: 40px; height: 40px; border: 3px solid #e5e7eb; border-top-color: %COLOR%; border-radius: 50%; animation: bertui-spin 0.7s linear infinite;"></div>
  <p style="margin-top: 16px; color: #6b7280; font-size: 14px; font-weight: 500;">%TEXT%</p>
</div>
<style>@keyframes bertui-spin { to { transform: rotate(360deg); } }</style>
<script>
  window.__BERTUI_HIDE_LOADING__ = function () {
    var el = document.getElementById('bertui-loading');
    if (el) { el.style.opacity = '0'; setTimeout(function () { el.remove(); }, 200); }
  };
  setTimeout(function () { window.__BERTUI_HIDE_LOADING__(); }, 5000);
  var observer = new MutationObserver(function () {
    var root = document.getElementById('root');
    if (root && root.children.length > 0) { window.__BERTUI_HIDE_LOADING__(); observer.disconnect(); }
  });
  var root = document.getElementById('root');
  if (root) observer.observe(root, { childList: true, subtree: true });
</script>"#;

/// App-shell loading overlay with custom text and accent color.
pub fn loading_screen_html(text: &str, color: &str) -> String {
  let text = text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
  let color: String =
    color.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | ' ' | '%')).collect();
  LOADING_SCREEN_TEMPLATE.replace("%COLOR%", &color).replace("%TEXT%", &text)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingComponent {
  /// Route whose subtree this component covers (`/` at the pages root).
  pub route_path: String,
  /// Path relative to the pages root.
  pub source_file: PathBuf,
}

impl LoadingComponent {
  /// JS identifier suffix: `/blog/[slug]` -> `blog__slug_`, `/` -> `root`.
  pub fn safe_name(&self) -> String {
    let trimmed = self.route_path.trim_start_matches('/');
    if trimmed.is_empty() {
      return "root".to_string();
    }
    trimmed.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingSet {
  components: BTreeMap<String, LoadingComponent>,
}

impl LoadingSet {
  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &LoadingComponent> {
    self.components.values()
  }

  pub fn insert(&mut self, component: LoadingComponent) {
    self.components.insert(component.route_path.clone(), component);
  }

  /// Exact route first, then the nearest ancestor, ending at `/`.
  pub fn match_loading(&self, route_path: &str) -> Option<&LoadingComponent> {
    let mut segments: Vec<&str> = route_path.split('/').filter(|s| !s.is_empty()).collect();
    loop {
      let candidate = format!("/{}", segments.join("/"));
      if let Some(hit) = self.components.get(&candidate) {
        return Some(hit);
      }
      segments.pop()?;
    }
  }
}

/// Find `loading.*` files anywhere under the pages root.
pub fn discover_loading_components(pages_root: &Path) -> Result<LoadingSet, CompileError> {
  let mut set = LoadingSet::default();
  if !pages_root.is_dir() {
    return Ok(set);
  }
  for entry in WalkDir::new(pages_root).sort_by_file_name() {
    let entry = entry.map_err(|e| CompileError::io(pages_root, e.into()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    let stem = path.file_stem().and_then(|s| s.to_str());
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if stem != Some(LOADING_FILE_STEM) || !PAGE_EXTENSIONS.contains(&ext) {
      continue;
    }
    let rel = path.strip_prefix(pages_root).unwrap_or(path).to_path_buf();
    let dir = rel.parent().map(to_slash).unwrap_or_default();
    set.insert(LoadingComponent { route_path: normalize_route_path(&dir), source_file: rel });
  }
  Ok(set)
}
