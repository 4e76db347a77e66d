/* src/cli/compiler/src/routes.rs */

// File-based route discovery: `src/pages/blog/[slug].jsx` -> `/blog/[slug]`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::CompileError;
use crate::paths::to_slash;

/// Extensions scanned as page modules. Stylesheets are never pages.
pub const PAGE_EXTENSIONS: &[&str] = &["jsx", "tsx", "js", "ts"];

/// Base names reserved by conventions (per-route loading states).
pub const RESERVED_NAMES: &[&str] = &["loading"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
  // Declaration order is the match priority: static before dynamic.
  Static,
  Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
  /// URL path, `[param]` segments kept verbatim.
  pub route_path: String,
  /// Path relative to the pages root.
  pub source_file: PathBuf,
  pub absolute_path: PathBuf,
  pub kind: RouteKind,
}

impl Route {
  /// Display form with `:param` segments, e.g. `/blog/:slug`.
  pub fn pattern(&self) -> String {
    self
      .route_path
      .split('/')
      .map(|seg| match param_name(seg) {
        Some(name) => format!(":{name}"),
        None => seg.to_string(),
      })
      .collect::<Vec<_>>()
      .join("/")
  }

  /// Parameter names in declaration order.
  pub fn param_names(&self) -> Vec<&str> {
    self.route_path.split('/').filter_map(param_name).collect()
  }

  /// Match a request path. Static routes need an exact match; dynamic
  /// segments each capture exactly one non-empty path segment.
  pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
    let path = normalize_route_path(path);
    match self.kind {
      RouteKind::Static => (self.route_path == path).then(BTreeMap::new),
      RouteKind::Dynamic => {
        let pattern: Vec<&str> = self.route_path.split('/').collect();
        let actual: Vec<&str> = path.split('/').collect();
        if pattern.len() != actual.len() {
          return None;
        }
        let mut params = BTreeMap::new();
        for (p, a) in pattern.iter().zip(actual.iter()) {
          match param_name(p) {
            Some(name) if !a.is_empty() => {
              params.insert(name.to_string(), (*a).to_string());
            }
            Some(_) => return None,
            None if p == a => {}
            None => return None,
          }
        }
        Some(params)
      }
    }
  }
}

/// `[slug]` -> `slug`
fn param_name(segment: &str) -> Option<&str> {
  segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')).filter(|s| !s.is_empty())
}

fn has_param_segment(route_path: &str) -> bool {
  route_path.split('/').any(|seg| param_name(seg).is_some())
}

/// Leading slash, no trailing slash, no empty segments; root is `/`.
pub fn normalize_route_path(path: &str) -> String {
  let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
  format!("/{}", segments.join("/"))
}

/// Route path for a file relative to the pages root; `None` if the file
/// is not a page (wrong extension or reserved name).
pub fn route_path_for(rel: &Path) -> Option<String> {
  let ext = rel.extension().and_then(|e| e.to_str())?;
  if !PAGE_EXTENSIONS.contains(&ext) {
    return None;
  }
  let stem = rel.file_stem().and_then(|s| s.to_str())?;
  if RESERVED_NAMES.contains(&stem) {
    return None;
  }
  let parent = rel.parent().map(to_slash).unwrap_or_default();
  let joined = if stem == "index" { parent } else { format!("{parent}/{stem}") };
  Some(normalize_route_path(&joined))
}

/// Static before dynamic, then lexicographic on the route path.
pub fn sort_routes(routes: &mut [Route]) {
  routes.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.route_path.cmp(&b.route_path)));
}

/// Walk the pages root and build the ordered route table.
/// A missing root is an error; an empty one yields no routes.
pub fn discover_routes(pages_root: &Path) -> Result<Vec<Route>, CompileError> {
  discover_routes_with_shadowed(pages_root).map(|(routes, _)| routes)
}

/// Like [`discover_routes`], also returning files whose route path was
/// already claimed by an earlier file (walk order is sorted, so the
/// winner is stable).
pub fn discover_routes_with_shadowed(
  pages_root: &Path,
) -> Result<(Vec<Route>, Vec<PathBuf>), CompileError> {
  if !pages_root.is_dir() {
    return Err(CompileError::DirectoryNotFound { path: pages_root.to_path_buf() });
  }

  let mut routes = Vec::new();
  let mut shadowed = Vec::new();
  let mut seen = BTreeSet::new();

  let walker = WalkDir::new(pages_root).sort_by_file_name().into_iter().filter_entry(|e| {
    e.depth() == 0 || !e.file_name().to_str().is_some_and(|n| n.starts_with('.'))
  });
  for entry in walker {
    let entry = entry.map_err(|e| {
      let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| pages_root.to_path_buf());
      CompileError::io(path, e.into())
    })?;
    if !entry.file_type().is_file() {
      continue;
    }
    let rel = entry.path().strip_prefix(pages_root).unwrap_or(entry.path()).to_path_buf();
    let Some(route_path) = route_path_for(&rel) else {
      continue;
    };
    if !seen.insert(route_path.clone()) {
      shadowed.push(rel);
      continue;
    }
    let kind = if has_param_segment(&route_path) { RouteKind::Dynamic } else { RouteKind::Static };
    routes.push(Route { route_path, source_file: rel, absolute_path: entry.into_path(), kind });
  }

  sort_routes(&mut routes);
  Ok((routes, shadowed))
}

/// First matching route for a request path, honouring the table order.
pub fn match_route<'a>(
  routes: &'a [Route],
  path: &str,
) -> Option<(&'a Route, BTreeMap<String, String>)> {
  routes.iter().find_map(|r| r.matches(path).map(|params| (r, params)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, "export default function Page() { return null; }").unwrap();
  }

  fn route(path: &str, kind: RouteKind) -> Route {
    Route {
      route_path: path.into(),
      source_file: PathBuf::from(path),
      absolute_path: PathBuf::from(path),
      kind,
    }
  }

  #[test]
  fn route_path_collapses_index() {
    assert_eq!(route_path_for(Path::new("index.jsx")).as_deref(), Some("/"));
    assert_eq!(route_path_for(Path::new("blog/index.tsx")).as_deref(), Some("/blog"));
    assert_eq!(route_path_for(Path::new("about.jsx")).as_deref(), Some("/about"));
  }

  #[test]
  fn route_path_skips_non_pages() {
    assert_eq!(route_path_for(Path::new("styles.css")), None);
    assert_eq!(route_path_for(Path::new("page.module.css")), None);
    assert_eq!(route_path_for(Path::new("blog/loading.tsx")), None);
    assert_eq!(route_path_for(Path::new("README")), None);
  }

  #[test]
  fn normalize_strips_double_and_trailing_slashes() {
    assert_eq!(normalize_route_path("//blog//post/"), "/blog/post");
    assert_eq!(normalize_route_path(""), "/");
  }

  #[test]
  fn discover_scenario_a() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "index.jsx");
    touch(dir.path(), "about.jsx");
    touch(dir.path(), "blog/[slug].jsx");

    let routes = discover_routes(dir.path()).unwrap();
    let paths: Vec<_> = routes.iter().map(|r| r.route_path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/about", "/blog/[slug]"]);
    assert_eq!(routes[0].kind, RouteKind::Static);
    assert_eq!(routes[1].kind, RouteKind::Static);
    assert_eq!(routes[2].kind, RouteKind::Dynamic);
    assert_eq!(routes[2].pattern(), "/blog/:slug");
    assert_eq!(routes[2].source_file, PathBuf::from("blog/[slug].jsx"));
  }

  #[test]
  fn discover_skips_reserved_and_styles() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "index.jsx");
    touch(dir.path(), "loading.tsx");
    touch(dir.path(), "blog/loading.jsx");
    touch(dir.path(), "home.css");
    let routes = discover_routes(dir.path()).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].route_path, "/");
  }

  #[test]
  fn discover_missing_root_is_error() {
    let dir = TempDir::new().unwrap();
    let err = discover_routes(&dir.path().join("pages")).unwrap_err();
    assert!(matches!(err, CompileError::DirectoryNotFound { .. }));
  }

  #[test]
  fn discover_empty_root_is_empty() {
    let dir = TempDir::new().unwrap();
    assert!(discover_routes(dir.path()).unwrap().is_empty());
  }

  #[test]
  fn discover_reports_shadowed_duplicates() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "about.jsx");
    touch(dir.path(), "about/index.jsx");
    let (routes, shadowed) = discover_routes_with_shadowed(dir.path()).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].source_file, PathBuf::from("about.jsx"));
    assert_eq!(shadowed, vec![PathBuf::from("about/index.jsx")]);
  }

  #[test]
  fn discovered_paths_are_well_formed() {
    let dir = TempDir::new().unwrap();
    for rel in ["index.jsx", "a/index.jsx", "a/b/c.tsx", "x/[id]/edit.jsx", "docs/[...].ts"] {
      touch(dir.path(), rel);
    }
    for r in discover_routes(dir.path()).unwrap() {
      assert!(r.route_path.starts_with('/'), "{}", r.route_path);
      assert!(!r.route_path.contains("//"), "{}", r.route_path);
    }
  }

  #[test]
  fn sort_puts_static_first_then_lexicographic() {
    let mut routes = vec![
      route("/users/[id]", RouteKind::Dynamic),
      route("/zeta", RouteKind::Static),
      route("/blog/[slug]", RouteKind::Dynamic),
      route("/about", RouteKind::Static),
      route("/", RouteKind::Static),
    ];
    sort_routes(&mut routes);
    let order: Vec<_> = routes.iter().map(|r| r.route_path.as_str()).collect();
    assert_eq!(order, vec!["/", "/about", "/zeta", "/blog/[slug]", "/users/[id]"]);
  }

  #[test]
  fn nested_bracket_directory_is_dynamic() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "users/[id]/edit.jsx");
    let routes = discover_routes(dir.path()).unwrap();
    assert_eq!(routes[0].kind, RouteKind::Dynamic);
    assert_eq!(routes[0].param_names(), vec!["id"]);
  }

  #[test]
  fn match_prefers_static_over_dynamic() {
    let mut routes = vec![route("/blog/[slug]", RouteKind::Dynamic), route("/blog/new", RouteKind::Static)];
    sort_routes(&mut routes);
    let (hit, params) = match_route(&routes, "/blog/new").unwrap();
    assert_eq!(hit.route_path, "/blog/new");
    assert!(params.is_empty());

    let (hit, params) = match_route(&routes, "/blog/hello/").unwrap();
    assert_eq!(hit.route_path, "/blog/[slug]");
    assert_eq!(params.get("slug").map(String::as_str), Some("hello"));
  }

  #[test]
  fn dynamic_segment_does_not_span_slashes() {
    let r = route("/blog/[slug]", RouteKind::Dynamic);
    assert!(r.matches("/blog/a/b").is_none());
    assert!(r.matches("/blog").is_none());
  }
}
