/* src/cli/compiler/src/compile/mod.rs */

// Whole-project compile: mirror `src/` into the compiled tree, then build
// the route table, hydration analysis, islands and `router.js` from it.


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ROUTER_MODULE;
use crate::cache::ContentCache;
use crate::classify::{AnalyzedRoute, HydrationReport, hydration_report};
use crate::css_module::{CssModuleMapping, is_css_module, scope_module};
use crate::env::generate_env_module;
use crate::error::{CompileError, IslandRejection};
use crate::island::extract_static_html;
use crate::layouts::{LayoutSet, discover_layouts};
use crate::loading::{LoadingSet, discover_loading_components};
use crate::paths::{COMPILED_EXTENSIONS, compiled_path, css_module_map_path, to_slash};
use crate::router_gen::{RouterModule, default_entry_module};
use crate::routes::{Route, discover_routes_with_shadowed};
use crate::transform::{Dialect, TransformContext, Transpiler, transform_source};

/// Generated `export const env` module at the compiled root.
pub const ENV_MODULE: &str = "bertui-env.js";
/// Entry module at the compiled root.
pub const ENTRY_MODULE: &str = "main.js";

const ENTRY_CANDIDATES: &[&str] = &["main.jsx", "main.tsx", "main.js", "main.ts"];

/// Conventional directories of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
  pub root: PathBuf,
}

impl ProjectLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn src_dir(&self) -> PathBuf {
    self.root.join("src")
  }

  pub fn pages_dir(&self) -> PathBuf {
    self.src_dir().join("pages")
  }

  pub fn layouts_dir(&self) -> PathBuf {
    self.src_dir().join("layouts")
  }

  pub fn styles_dir(&self) -> PathBuf {
    self.src_dir().join("styles")
  }

  pub fn images_dir(&self) -> PathBuf {
    self.src_dir().join("images")
  }

  pub fn public_dir(&self) -> PathBuf {
    self.root.join("public")
  }

  /// `src/main.{jsx,tsx,js,ts}` if the project provides its own entry.
  pub fn main_entry(&self) -> Option<PathBuf> {
    let src = self.src_dir();
    ENTRY_CANDIDATES.iter().map(|name| src.join(name)).find(|p| p.is_file())
  }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
  /// Root of the compiled mirror tree.
  pub out_dir: PathBuf,
  /// Already filtered to exposed names.
  pub env: BTreeMap<String, String>,
}

impl CompileOptions {
  /// Cache fingerprint for everything besides the source text that changes
  /// a transform's output.
  fn fingerprint(&self, rel: &Path) -> String {
    let mut fp = format!("{}|{}", to_slash(rel), Dialect::from_path(rel).loader());
    for (k, v) in &self.env {
      fp.push_str(&format!("|{k}={v}"));
    }
    fp
  }
}

/// Static HTML for a server-island route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandPage {
  pub route_path: String,
  pub source_file: PathBuf,
  pub html: String,
}

#[derive(Debug, Default)]
pub struct CompileReport {
  pub out_dir: PathBuf,
  /// Sources transformed, scoped or copied.
  pub files: usize,
  pub skipped: usize,
  pub routes: Vec<Route>,
  /// Page files whose route path was claimed by an earlier file.
  pub shadowed: Vec<PathBuf>,
  pub analyzed: Vec<AnalyzedRoute>,
  pub islands: Vec<IslandPage>,
  /// Server-island routes that fell back to client rendering.
  pub island_rejections: Vec<(String, IslandRejection)>,
  /// File-level failures; other files were still written.
  pub failures: Vec<CompileError>,
  pub css_modules: Vec<CssModuleMapping>,
  pub layouts: LayoutSet,
  pub loading: LoadingSet,
  /// True when `main.js` was generated because `src/main.*` is absent.
  pub generated_entry: bool,
}

impl CompileReport {
  pub fn is_success(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn hydration_report(&self) -> HydrationReport {
    hydration_report(&self.analyzed)
  }

  /// Routes rendered on the client (everything not extracted as an island).
  pub fn client_routes(&self) -> impl Iterator<Item = &Route> {
    self.routes.iter().filter(|r| !self.islands.iter().any(|i| i.route_path == r.route_path))
  }

  /// Scoped CSS of every module, in walk order.
  pub fn scoped_css(&self) -> String {
    self
      .css_modules
      .iter()
      .map(|m| format!("/* {} */\n{}", to_slash(&m.source_file), m.scoped_css.trim_end()))
      .collect::<Vec<_>>()
      .join("\n")
  }
}

fn read_to_string(path: &Path, cache: &ContentCache) -> Result<String, CompileError> {
  match cache.get_file(path) {
    Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
    None => std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e)),
  }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), CompileError> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
  }
  std::fs::write(path, contents).map_err(|e| CompileError::io(path, e))
}

/// Compile `project` into `options.out_dir`.
///
/// Fatal: missing `src/` or `src/pages/`, and I/O errors writing output.
/// Per-file transform failures are collected in [`CompileReport::failures`].
pub fn compile_project(
  project: &ProjectLayout,
  options: &CompileOptions,
  transpiler: &dyn Transpiler,
  cache: &ContentCache,
) -> Result<CompileReport, CompileError> {
  let src_dir = project.src_dir();
  if !src_dir.is_dir() {
    return Err(CompileError::DirectoryNotFound { path: src_dir });
  }
  let out_dir = options.out_dir.clone();
  std::fs::create_dir_all(&out_dir).map_err(|e| CompileError::io(&out_dir, e))?;

  let mut report = CompileReport { out_dir: out_dir.clone(), ..CompileReport::default() };
  let ctx = TransformContext { src_root: &src_dir, out_root: &out_dir, env: &options.env };

  compile_tree(&src_dir, options, &ctx, transpiler, cache, &mut report)?;

  let (routes, shadowed) = discover_routes_with_shadowed(&project.pages_dir())?;
  report.shadowed = shadowed;

  for route in &routes {
    let analyzed = match read_to_string(&route.absolute_path, cache) {
      Ok(source) => {
        let analyzed = AnalyzedRoute::new(route.clone(), &source);
        if analyzed.is_server_island {
          match extract_static_html(&source) {
            Ok(html) => report.islands.push(IslandPage {
              route_path: route.route_path.clone(),
              source_file: route.source_file.clone(),
              html,
            }),
            Err(reason) => report.island_rejections.push((route.route_path.clone(), reason)),
          }
        }
        analyzed
      }
      Err(_) => AnalyzedRoute::unreadable(route.clone()),
    };
    report.analyzed.push(analyzed);
  }

  report.layouts = discover_layouts(&project.layouts_dir())?;
  report.loading = discover_loading_components(&project.pages_dir())?;

  let router = RouterModule::new(&routes)
    .hydration(&report.analyzed)
    .layouts(&report.layouts)
    .loading(&report.loading)
    .render();
  write_file(&out_dir.join(ROUTER_MODULE), router.as_bytes())?;
  write_file(&out_dir.join(ENV_MODULE), generate_env_module(&options.env).as_bytes())?;

  if project.main_entry().is_none() {
    write_file(&out_dir.join(ENTRY_MODULE), default_entry_module().as_bytes())?;
    report.generated_entry = true;
  }

  report.routes = routes;
  Ok(report)
}

fn compile_tree(
  src_dir: &Path,
  options: &CompileOptions,
  ctx: &TransformContext<'_>,
  transpiler: &dyn Transpiler,
  cache: &ContentCache,
  report: &mut CompileReport,
) -> Result<(), CompileError> {
  let walker = WalkDir::new(src_dir).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() == 0 || !e.file_name().to_str().is_some_and(|n| n.starts_with('.'))
  });

  for entry in walker {
    let entry = entry.map_err(|e| CompileError::io(src_dir, e.into()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let path = entry.path();
    let rel = path.strip_prefix(src_dir).unwrap_or(path);
    let name = entry.file_name().to_string_lossy();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    if is_css_module(&name) {
      let css = read_to_string(path, cache)?;
      let mapping = scope_module(&css, &to_slash(rel), rel.to_path_buf());
      let map_path = css_module_map_path(ctx.src_root, ctx.out_root, path);
      write_file(&map_path, mapping.to_module_source().as_bytes())?;
      write_file(&compiled_path(ctx.src_root, ctx.out_root, path), mapping.scoped_css.as_bytes())?;
      report.css_modules.push(mapping);
      report.files += 1;
    } else if COMPILED_EXTENSIONS.contains(&ext) {
      let source = read_to_string(path, cache)?;
      let fingerprint = options.fingerprint(rel);
      let output = match cache.get_transformed(&source, &fingerprint) {
        Some(hit) => hit,
        None => match transform_source(&source, path, ctx, transpiler) {
          Ok(out) => {
            cache.set_transformed(&source, &fingerprint, out.clone());
            out
          }
          Err(err) => {
            report.failures.push(err);
            continue;
          }
        },
      };
      write_file(&compiled_path(ctx.src_root, ctx.out_root, path), output.as_bytes())?;
      report.files += 1;
    } else if ext == "js" || ext == "css" {
      let target = compiled_path(ctx.src_root, ctx.out_root, path);
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
      }
      std::fs::copy(path, &target).map_err(|e| CompileError::io(path, e))?;
      report.files += 1;
    } else {
      report.skipped += 1;
    }
  }
  Ok(())
}
