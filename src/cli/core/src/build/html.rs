/* src/cli/core/src/build/html.rs */

// HTML documents for production pages and the dev shell.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bertui_compiler::loading::loading_screen_html;
use bertui_compiler::{IslandPage, Route, RouteKind};

use crate::config::{AppShellSection, MetaSection};

const REACT_VERSION: &str = "18.2.0";

/// Escape text for use inside an HTML attribute or text node.
pub fn escape_html(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn cdn_url(specifier: &str) -> String {
  let (package, subpath) = match specifier.strip_prefix('@') {
    Some(rest) => match rest.splitn(3, '/').collect::<Vec<_>>().as_slice() {
      [scope, name, sub] => (format!("@{scope}/{name}"), Some(*sub)),
      _ => (specifier.to_string(), None),
    },
    None => match specifier.split_once('/') {
      Some((name, sub)) => (name.to_string(), Some(sub)),
      None => (specifier.to_string(), None),
    },
  };
  let versioned = if package == "react" || package == "react-dom" {
    format!("{package}@{REACT_VERSION}")
  } else {
    package
  };
  match subpath {
    Some(sub) => format!("https://esm.sh/{versioned}/{sub}"),
    None => format!("https://esm.sh/{versioned}"),
  }
}

/// `<script type="importmap">` resolving bundler externals to a CDN.
pub fn import_map(externals: &[String]) -> String {
  let imports: serde_json::Map<String, serde_json::Value> =
    externals.iter().map(|e| (e.clone(), serde_json::Value::String(cdn_url(e)))).collect();
  let json = serde_json::json!({ "imports": imports });
  format!("<script type=\"importmap\">{json}</script>")
}

#[derive(Debug, Default)]
pub struct Document<'a> {
  pub meta: Option<&'a MetaSection>,
  pub stylesheets: Vec<String>,
  pub import_map: Option<String>,
  /// Overlay shown until the app mounts.
  pub loading_screen: Option<String>,
  /// Markup placed inside `#root`.
  pub root_html: &'a str,
  pub module_scripts: Vec<String>,
  /// Raw HTML appended after the scripts.
  pub body_extra: Option<String>,
}

impl Document<'_> {
  pub fn render(&self) -> String {
    let default_meta = MetaSection::default();
    let meta = self.meta.unwrap_or(&default_meta);
    let mut html = format!(
      "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
       <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n  \
       <title>{}</title>\n  <meta name=\"description\" content=\"{}\">\n",
      escape_html(&meta.lang),
      escape_html(&meta.title),
      escape_html(&meta.description),
    );
    let optional = [
      ("keywords", meta.keywords.as_deref()),
      ("author", meta.author.as_deref()),
      ("theme-color", meta.theme_color.as_deref()),
    ];
    for (name, value) in optional {
      if let Some(v) = value {
        html.push_str(&format!("  <meta name=\"{name}\" content=\"{}\">\n", escape_html(v)));
      }
    }
    html.push_str(&format!("  <meta property=\"og:title\" content=\"{}\">\n", escape_html(&meta.title)));
    if let Some(img) = &meta.og_image {
      html.push_str(&format!("  <meta property=\"og:image\" content=\"{}\">\n", escape_html(img)));
    }
    for href in &self.stylesheets {
      html.push_str(&format!("  <link rel=\"stylesheet\" href=\"{href}\">\n"));
    }
    if let Some(map) = &self.import_map {
      html.push_str(&format!("  {map}\n"));
    }
    html.push_str("</head>\n<body>\n");
    if let Some(loading) = &self.loading_screen {
      html.push_str(loading);
      html.push('\n');
    }
    html.push_str(&format!("  <div id=\"root\">{}</div>\n", self.root_html));
    for src in &self.module_scripts {
      html.push_str(&format!("  <script type=\"module\" src=\"{src}\"></script>\n"));
    }
    if let Some(extra) = &self.body_extra {
      html.push_str(extra);
      html.push('\n');
    }
    html.push_str("</body>\n</html>\n");
    html
  }
}

/// `/` -> `index.html`, `/about` -> `about/index.html`.
pub fn page_output_path(out_dir: &Path, route_path: &str) -> PathBuf {
  let trimmed = route_path.trim_matches('/');
  if trimmed.is_empty() { out_dir.join("index.html") } else { out_dir.join(trimmed).join("index.html") }
}

pub struct PageAssets<'a> {
  pub stylesheet: Option<&'a str>,
  pub scripts: &'a [String],
  pub externals: &'a [String],
}

/// Document for one route: island HTML with zero JS, or the client app shell.
pub fn render_page(
  island: Option<&IslandPage>,
  meta: &MetaSection,
  shell: &AppShellSection,
  assets: &PageAssets<'_>,
) -> String {
  let stylesheets = assets.stylesheet.map(|s| vec![s.to_string()]).unwrap_or_default();
  match island {
    Some(page) => Document {
      meta: Some(meta),
      stylesheets,
      root_html: &page.html,
      ..Document::default()
    }
    .render(),
    None => Document {
      meta: Some(meta),
      stylesheets,
      import_map: Some(import_map(assets.externals)),
      loading_screen: shell
        .loading
        .then(|| loading_screen_html(&shell.loading_text, &shell.background_color)),
      root_html: "",
      module_scripts: assets.scripts.to_vec(),
      body_extra: None,
    }
    .render(),
  }
}

/// Write one document per static route; dynamic routes are served by the
/// root shell. `index.html` is always written for SPA fallback.
pub fn generate_pages(
  out_dir: &Path,
  routes: &[Route],
  islands: &[IslandPage],
  meta: &MetaSection,
  shell: &AppShellSection,
  assets: &PageAssets<'_>,
) -> Result<Vec<PathBuf>> {
  let mut written = Vec::new();
  let mut wrote_root = false;
  for route in routes.iter().filter(|r| r.kind == RouteKind::Static) {
    let island = islands.iter().find(|i| i.route_path == route.route_path);
    let path = page_output_path(out_dir, &route.route_path);
    write_page(&path, &render_page(island, meta, shell, assets))?;
    wrote_root |= route.route_path == "/";
    written.push(path);
  }
  if !wrote_root {
    let path = page_output_path(out_dir, "/");
    write_page(&path, &render_page(None, meta, shell, assets))?;
    written.push(path);
  }
  Ok(written)
}

fn write_page(path: &Path, html: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  std::fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn externals() -> Vec<String> {
    vec!["react".into(), "react-dom".into(), "react-dom/client".into()]
  }

  #[test]
  fn import_map_pins_react() {
    let map = import_map(&externals());
    assert!(map.contains(r#""react":"https://esm.sh/react@18.2.0""#));
    assert!(map.contains(r#""react-dom/client":"https://esm.sh/react-dom@18.2.0/client""#));
  }

  #[test]
  fn scoped_packages_keep_scope() {
    assert_eq!(cdn_url("@tanstack/query/devtools"), "https://esm.sh/@tanstack/query/devtools");
    assert_eq!(cdn_url("lodash"), "https://esm.sh/lodash");
  }

  #[test]
  fn output_paths() {
    let out = Path::new("/dist");
    assert_eq!(page_output_path(out, "/"), PathBuf::from("/dist/index.html"));
    assert_eq!(page_output_path(out, "/docs/intro"), PathBuf::from("/dist/docs/intro/index.html"));
  }

  #[test]
  fn island_page_ships_no_js() {
    let island = IslandPage {
      route_path: "/".into(),
      source_file: PathBuf::from("index.jsx"),
      html: "<h1>Hi</h1>".into(),
    };
    let scripts = vec!["/assets/main-abc.js".to_string()];
    let ext = externals();
    let assets = PageAssets { stylesheet: Some("/styles/bertui.min.css"), scripts: &scripts, externals: &ext };
    let html =
      render_page(Some(&island), &MetaSection::default(), &AppShellSection::default(), &assets);
    assert!(html.contains("<div id=\"root\"><h1>Hi</h1></div>"));
    assert!(html.contains("href=\"/styles/bertui.min.css\""));
    assert!(!html.contains("<script"));
    assert!(!html.contains("bertui-loading"));
  }

  #[test]
  fn client_page_has_shell_and_scripts() {
    let scripts = vec!["/assets/main-abc.js".to_string()];
    let ext = externals();
    let assets = PageAssets { stylesheet: None, scripts: &scripts, externals: &ext };
    let meta = MetaSection { title: "A & B".into(), ..MetaSection::default() };
    let html = render_page(None, &meta, &AppShellSection::default(), &assets);
    assert!(html.contains("<title>A &amp; B</title>"));
    assert!(html.contains("<script type=\"importmap\">"));
    assert!(html.contains("id=\"bertui-loading\""));
    assert!(html.contains("<script type=\"module\" src=\"/assets/main-abc.js\"></script>"));
    assert!(html.contains("<div id=\"root\"></div>"));
  }

  #[test]
  fn disabled_loading_screen_is_omitted() {
    let shell = AppShellSection { loading: false, ..AppShellSection::default() };
    let assets = PageAssets { stylesheet: None, scripts: &[], externals: &[] };
    let html = render_page(None, &MetaSection::default(), &shell, &assets);
    assert!(!html.contains("bertui-loading"));
  }
}
