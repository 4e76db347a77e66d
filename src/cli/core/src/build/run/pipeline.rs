/* src/cli/core/src/build/run/pipeline.rs */

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::Context;
use bertui_compiler::compile::ENTRY_MODULE;
use bertui_compiler::{
  CompileOptions, CompileReport, ContentCache, ProjectLayout, ROUTER_MODULE, compile_project,
};

use super::{BuildDirs, Toolchain};
use crate::build::assets::copy_static_assets;
use crate::build::bundle::{BundleOutput, BundleRequest};
use crate::build::css::{STYLESHEET, combine_styles, compile_scss, stylesheet_sources, transform_cached};
use crate::build::html::{PageAssets, generate_pages};
use crate::build::report::{print_cache_stats, print_compile_report, print_hydration_report};
use crate::build::sitemap::{generate_robots, generate_sitemap};
use crate::build::types::{BuildSummary, Diagnostics};
use crate::config::BertuiConfig;
use crate::ui::{self, DIM, RESET};

const TOTAL_STEPS: u32 = 8;
const ASSETS_DIR: &str = "assets";
/// Compiled SCSS, kept apart from the copied `styles/` mirror.
const SCSS_DIR: &str = "scss";

fn write_output(path: &std::path::Path, contents: &str) -> anyhow::Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Origin for sitemap and robots entries.
pub(super) fn base_url(config: &BertuiConfig) -> String {
  match &config.site.base_url {
    Some(url) => url.trim_end_matches('/').to_string(),
    None => format!("http://localhost:{}", config.dev.port),
  }
}

pub(super) fn run(
  config: &BertuiConfig,
  dirs: &BuildDirs,
  toolchain: &Toolchain<'_>,
  env: &BTreeMap<String, String>,
  cache: &ContentCache,
) -> Result<BuildSummary, Diagnostics> {
  let started = Instant::now();
  let project = ProjectLayout::new(&dirs.root);

  // [1/8] Compile
  ui::step(1, TOTAL_STEPS, "Compiling for production");
  let options = CompileOptions { out_dir: dirs.build.clone(), env: env.clone() };
  let report = compile_project(&project, &options, toolchain.transpiler, cache)?;
  print_compile_report(&report);
  if !report.is_success() {
    return Err(Diagnostics(report.failures.iter().map(ToString::to_string).collect()));
  }
  let hydration = report.hydration_report();
  print_hydration_report(&hydration);
  ui::blank();

  // [2/8] SCSS
  ui::step(2, TOTAL_STEPS, "Compiling SCSS");
  let scss_out = dirs.build.join(SCSS_DIR);
  let scss_count = compile_scss(&project.styles_dir(), &scss_out, &dirs.root)?;
  if scss_count > 0 {
    ui::detail_ok(&format!("{scss_count} SCSS files"));
  }
  ui::blank();

  // [3/8] CSS
  ui::step(3, TOTAL_STEPS, "Building CSS");
  let stylesheet = build_stylesheet(&project, dirs, &report, toolchain, cache)?;
  ui::blank();

  // [4/8] Assets
  ui::step(4, TOTAL_STEPS, "Copying assets");
  let copied = copy_static_assets(&project.public_dir(), &project.images_dir(), &dirs.out)?;
  ui::detail_ok(&format!("{} public \u{00b7} {} images", copied.public, copied.images));
  ui::blank();

  // [5/8] Bundle
  ui::step(5, TOTAL_STEPS, "Bundling JavaScript");
  let bundle = bundle_js(config, dirs, toolchain, env)?;
  let main_entry = bundle
    .entry("main")
    .ok_or_else(|| Diagnostics(vec!["bundler produced no main entry chunk".to_string()]))?;
  for file in &bundle.files {
    ui::detail(&format!("{DIM}{ASSETS_DIR}/{}{RESET}  {}", file.path, ui::format_size(file.size)));
  }
  ui::blank();

  // [6/8] HTML
  ui::step(6, TOTAL_STEPS, "Generating HTML");
  let scripts = vec![format!("/{ASSETS_DIR}/{}", main_entry.path)];
  let page_assets = PageAssets {
    stylesheet: stylesheet.as_deref(),
    scripts: &scripts,
    externals: &config.build.externals,
  };
  let pages = generate_pages(
    &dirs.out,
    &report.routes,
    &report.islands,
    &config.meta,
    &config.app_shell,
    &page_assets,
  )?;
  ui::detail_ok(&format!("{} pages", pages.len()));
  ui::blank();

  let base = base_url(config);

  // [7/8] Sitemap
  ui::step(7, TOTAL_STEPS, "Generating sitemap.xml");
  write_output(&dirs.out.join("sitemap.xml"), &generate_sitemap(&base, &report.routes))?;
  ui::blank();

  // [8/8] Robots
  ui::step(8, TOTAL_STEPS, "Generating robots.txt");
  write_output(&dirs.out.join("robots.txt"), &generate_robots(&base, &config.robots.disallow))?;
  ui::blank();

  Ok(BuildSummary {
    routes: report.routes.len(),
    islands: report.islands.len(),
    client_routes: report.client_routes().count(),
    pages: pages.len(),
    duration: started.elapsed(),
    cache: cache.stats(),
    hydration,
    bundle: bundle.files,
  })
}

/// Writes `styles/bertui.min.css` and returns its href, or `None` when the
/// project has no styles at all.
fn build_stylesheet(
  project: &ProjectLayout,
  dirs: &BuildDirs,
  report: &CompileReport,
  toolchain: &Toolchain<'_>,
  cache: &ContentCache,
) -> Result<Option<String>, Diagnostics> {
  let sources = stylesheet_sources(&project.styles_dir(), &dirs.build.join(SCSS_DIR))?;
  let combined = combine_styles(&sources, &report.scoped_css())?;
  if combined.trim().is_empty() {
    ui::detail(&format!("{DIM}no stylesheets{RESET}"));
    return Ok(None);
  }
  let css = transform_cached(toolchain.css, cache, &combined, STYLESHEET)?;
  let target = dirs.out.join("styles").join(STYLESHEET);
  write_output(&target, &css)?;
  ui::detail_ok(&format!(
    "styles/{STYLESHEET}  {} \u{2192} {}",
    ui::format_size(combined.len() as u64),
    ui::format_size(css.len() as u64)
  ));
  Ok(Some(format!("/styles/{STYLESHEET}")))
}

fn bundle_js(
  config: &BertuiConfig,
  dirs: &BuildDirs,
  toolchain: &Toolchain<'_>,
  env: &BTreeMap<String, String>,
) -> Result<BundleOutput, Diagnostics> {
  let entry = dirs.build.join(ENTRY_MODULE);
  if !entry.is_file() {
    return Err(Diagnostics(vec![format!("Build entry point missing: {}", entry.display())]));
  }
  let mut entrypoints = vec![entry];
  let router = dirs.build.join(ROUTER_MODULE);
  if router.is_file() {
    entrypoints.push(router);
  }
  let request = BundleRequest {
    cwd: dirs.build.clone(),
    entrypoints,
    out_dir: dirs.out.join(ASSETS_DIR),
    externals: config.build.externals.clone(),
    define: BundleRequest::production_defines(env),
    minify: config.build.minify,
    sourcemap: config.build.sourcemap,
  };
  Ok(toolchain.bundler.bundle(&request)?)
}

pub(super) fn print_summary(summary: &BuildSummary, dirs: &BuildDirs) {
  let bundle_size: u64 = summary.bundle.iter().map(|f| f.size).sum();
  ui::ok(&format!("build complete in {:.1}s", summary.duration.as_secs_f64()));
  ui::detail(&format!(
    "{} routes \u{00b7} {} islands \u{00b7} {} pages \u{00b7} {} JS",
    summary.routes,
    summary.islands,
    summary.pages,
    ui::format_size(bundle_size),
  ));
  print_cache_stats(&summary.cache);
  ui::arrow(&format!("output: {}", dirs.out.display()));
}
