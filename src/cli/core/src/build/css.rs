/* src/cli/core/src/build/css.rs */

// Global stylesheet: plain CSS from src/styles, compiled SCSS, and scoped
// CSS-module output, combined and minified into one file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use bertui_compiler::ContentCache;
use bertui_compiler::css_module::is_css_module;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

use crate::shell::{run_program, which_exists};
use crate::ui;

pub const STYLESHEET: &str = "bertui.min.css";

pub trait CssTransformer {
  fn transform(&self, css: &str, filename: &str) -> Result<String>;
}

/// LightningCSS parse + minify + print.
#[derive(Debug, Clone, Copy)]
pub struct LightningCss {
  pub minify: bool,
}

impl CssTransformer for LightningCss {
  fn transform(&self, css: &str, filename: &str) -> Result<String> {
    let options = ParserOptions { filename: filename.to_string(), ..ParserOptions::default() };
    let mut sheet =
      StyleSheet::parse(css, options).map_err(|e| anyhow!("CSS parse error in {filename}: {e}"))?;
    if self.minify {
      sheet.minify(MinifyOptions::default()).map_err(|e| anyhow!("CSS minify error: {e}"))?;
    }
    let printed = sheet
      .to_css(PrinterOptions { minify: self.minify, ..PrinterOptions::default() })
      .map_err(|e| anyhow!("CSS print error: {e}"))?;
    Ok(printed.code)
  }
}

fn has_ext(path: &Path, exts: &[&str]) -> bool {
  path.extension().and_then(|e| e.to_str()).is_some_and(|e| exts.contains(&e))
}

fn sorted_files(dir: &Path, exts: &[&str]) -> Result<Vec<PathBuf>> {
  if !dir.is_dir() {
    return Ok(vec![]);
  }
  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
    let path = entry?.path();
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    if path.is_file() && has_ext(&path, exts) && !is_css_module(&name) {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

/// Plain stylesheets from `styles_dir`, then compiled SCSS from `scss_out_dir`.
pub fn stylesheet_sources(styles_dir: &Path, scss_out_dir: &Path) -> Result<Vec<PathBuf>> {
  let mut files = sorted_files(styles_dir, &["css"])?;
  files.extend(sorted_files(scss_out_dir, &["css"])?);
  Ok(files)
}

/// Concatenate `files` and the scoped module CSS, each under a name comment.
pub fn combine_styles(files: &[PathBuf], scoped_css: &str) -> Result<String> {
  let mut out = String::new();
  for file in files {
    let css = std::fs::read_to_string(file)
      .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    out.push_str(&format!("/* {name} */\n{}\n", css.trim_end()));
  }
  if !scoped_css.trim().is_empty() {
    out.push_str(scoped_css.trim_end());
    out.push('\n');
  }
  Ok(out)
}

/// Compile `src/styles/*.{scss,sass}` into `out_dir` with the `sass` CLI.
/// Skipped with a warning when `sass` is not installed.
pub fn compile_scss(styles_dir: &Path, out_dir: &Path, base_dir: &Path) -> Result<usize> {
  let sources = sorted_files(styles_dir, &["scss", "sass"])?;
  let sources: Vec<_> = sources
    .into_iter()
    .filter(|p| !p.file_name().is_some_and(|n| n.to_string_lossy().starts_with('_')))
    .collect();
  if sources.is_empty() {
    return Ok(0);
  }
  if !which_exists("sass") {
    ui::detail_warn("sass not installed, skipping SCSS (install with: bun add -g sass)");
    return Ok(0);
  }
  std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
  let load_styles = format!("--load-path={}", styles_dir.display());
  let load_modules = format!("--load-path={}", base_dir.join("node_modules").display());
  for src in &sources {
    let target = out_dir.join(src.with_extension("css").file_name().unwrap_or_default());
    let src_arg = src.to_string_lossy();
    let target_arg = target.to_string_lossy();
    run_program(
      base_dir,
      "sass",
      &["--no-source-map", "--style=compressed", &load_styles, &load_modules, &src_arg, &target_arg],
      "sass",
    )?;
  }
  Ok(sources.len())
}

/// Transform through `transformer`, reusing a cached result for identical input.
pub fn transform_cached(
  transformer: &dyn CssTransformer,
  cache: &ContentCache,
  css: &str,
  filename: &str,
) -> Result<String> {
  if let Some(hit) = cache.get_css(css, filename) {
    return Ok(hit);
  }
  let out = transformer.transform(css, filename)?;
  cache.set_css(css, filename, out.clone());
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Upper;

  impl CssTransformer for Upper {
    fn transform(&self, css: &str, _filename: &str) -> Result<String> {
      Ok(css.to_uppercase())
    }
  }

  #[test]
  fn lightningcss_minifies() {
    let out = LightningCss { minify: true }.transform(".a {\n  color: #ff0000;\n}\n", "a.css").unwrap();
    assert!(out.starts_with(".a{"));
    assert!(!out.contains('\n'));
  }

  #[test]
  fn sources_skip_modules_and_sort() {
    let dir = tempfile::TempDir::new().unwrap();
    let styles = dir.path().join("styles");
    let scss_out = dir.path().join("build/styles");
    std::fs::create_dir_all(&styles).unwrap();
    std::fs::create_dir_all(&scss_out).unwrap();
    std::fs::write(styles.join("z.css"), ".z{}").unwrap();
    std::fs::write(styles.join("a.css"), ".a{}").unwrap();
    std::fs::write(styles.join("card.module.css"), ".c{}").unwrap();
    std::fs::write(styles.join("theme.scss"), "$x: 1;").unwrap();
    std::fs::write(scss_out.join("theme.css"), ".t{}").unwrap();

    let files = stylesheet_sources(&styles, &scss_out).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.file_name().unwrap().to_str().unwrap()).collect();
    assert_eq!(names, vec!["a.css", "z.css", "theme.css"]);

    let combined = combine_styles(&files, ".title_x1{color:red}").unwrap();
    assert!(combined.starts_with("/* a.css */\n.a{}\n/* z.css */"));
    assert!(combined.ends_with(".title_x1{color:red}\n"));
  }

  #[test]
  fn cached_transform_runs_once() {
    let cache = ContentCache::default();
    assert_eq!(transform_cached(&Upper, &cache, ".a{}", "x.css").unwrap(), ".A{}");
    assert_eq!(transform_cached(&Upper, &cache, ".a{}", "x.css").unwrap(), ".A{}");
    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.sets, 1);
  }
}
