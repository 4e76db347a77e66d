/* src/cli/core/src/analyze.rs */

// `bertui analyze`: size breakdown of the built `assets/` directory,
// written as a standalone HTML report next to the build output.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::build::bundle::BundleOutput;
use crate::build::html::escape_html;
use crate::build::types::OutputFile;
use crate::config::BertuiConfig;
use crate::shell::run_program;
use crate::ui::{self, DIM, RESET};

pub const REPORT_FILE: &str = "bundle-report.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
  JavaScript,
  Css,
  Image,
  Other,
}

impl AssetKind {
  pub fn of(path: &str) -> Self {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
      Some("js" | "mjs") => Self::JavaScript,
      Some("css") => Self::Css,
      Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif") => Self::Image,
      _ => Self::Other,
    }
  }

  fn label(self) -> &'static str {
    match self {
      Self::JavaScript => "javascript",
      Self::Css => "css",
      Self::Image => "image",
      Self::Other => "other",
    }
  }

  fn color(self) -> &'static str {
    match self {
      Self::JavaScript => "#3b82f6",
      Self::Css => "#8b5cf6",
      Self::Image => "#f59e0b",
      Self::Other => "#10b981",
    }
  }
}

/// Assets largest first; ties by path.
pub fn by_size(output: &BundleOutput) -> Vec<&OutputFile> {
  let mut files: Vec<_> = output.files.iter().collect();
  files.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
  files
}

pub fn render_report(output: &BundleOutput, title: &str) -> String {
  let files = by_size(output);
  let total = output.total_size();
  let largest = files.first().map_or(1, |f| f.size.max(1));

  let mut cards = String::new();
  for kind in [AssetKind::JavaScript, AssetKind::Css, AssetKind::Image, AssetKind::Other] {
    let (count, size) = files
      .iter()
      .filter(|f| AssetKind::of(&f.path) == kind)
      .fold((0usize, 0u64), |(n, s), f| (n + 1, s + f.size));
    if count > 0 {
      let _ = write!(
        cards,
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div><div class=\"sub\">{count} files</div></div>",
        kind.label(),
        ui::format_size(size),
      );
    }
  }

  let mut rows = String::new();
  for f in &files {
    let kind = AssetKind::of(&f.path);
    let pct = if total > 0 { f.size as f64 / total as f64 * 100.0 } else { 0.0 };
    let bar = (f.size * 200 / largest).max(2);
    let _ = write!(
      rows,
      "<tr><td><span class=\"dot\" style=\"background:{color}\"></span>{path}</td><td>{kind}</td><td>{size}</td><td><div class=\"bar\" style=\"width:{bar}px;background:{color}\"></div> {pct:.1}%</td></tr>",
      color = kind.color(),
      path = escape_html(&f.path),
      kind = kind.label(),
      size = ui::format_size(f.size),
    );
  }

  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #0f172a; color: #e2e8f0; padding: 32px; }}
    h1 {{ font-size: 28px; margin: 0 0 24px; }}
    .cards {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 16px; margin-bottom: 32px; }}
    .card {{ background: #1e293b; border: 1px solid #334155; border-radius: 12px; padding: 20px; }}
    .label {{ font-size: 12px; color: #64748b; text-transform: uppercase; }}
    .value {{ font-size: 28px; font-weight: 700; }}
    .sub {{ font-size: 12px; color: #64748b; }}
    table {{ width: 100%; border-collapse: collapse; background: #1e293b; }}
    th, td {{ text-align: left; padding: 10px 16px; border-bottom: 1px solid #334155; font-size: 13px; }}
    .dot {{ display: inline-block; width: 8px; height: 8px; border-radius: 50%; margin-right: 8px; }}
    .bar {{ display: inline-block; height: 6px; border-radius: 3px; vertical-align: middle; }}
  </style>
</head>
<body>
  <h1>{title}</h1>
  <div class="cards"><div class="card"><div class="label">total</div><div class="value">{total_size}</div><div class="sub">{count} files</div></div>{cards}</div>
  <table>
    <thead><tr><th>File</th><th>Type</th><th>Size</th><th>Share</th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
</body>
</html>
"#,
    title = escape_html(title),
    total_size = ui::format_size(total),
    count = files.len(),
  )
}

fn open_in_browser(base_dir: &Path, report: &Path) -> Result<()> {
  let opener = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
  let target = report.to_string_lossy();
  run_program(base_dir, opener, &[target.as_ref()], "browser")
}

/// Write the report for `<out_dir>/assets` and return its path.
pub fn run_analyze(config: &BertuiConfig, base_dir: &Path, open: bool) -> Result<PathBuf> {
  let out_dir = base_dir.join(&config.build.out_dir);
  let assets = out_dir.join("assets");
  if !assets.is_dir() {
    bail!("{} does not exist -- run `bertui build` first", assets.display());
  }

  ui::banner("analyze", Some(config.project_name()));
  let output = BundleOutput::collect(&assets)?;
  for f in by_size(&output) {
    ui::detail(&format!("{:<40} {DIM}{}{RESET}", f.path, ui::format_size(f.size)));
  }

  let report = out_dir.join(REPORT_FILE);
  let title = format!("{} Bundle Report", config.project_name());
  std::fs::write(&report, render_report(&output, &title))
    .with_context(|| format!("failed to write {}", report.display()))?;
  ui::ok(&format!(
    "{} in {} files \u{00b7} report: {}",
    ui::format_size(output.total_size()),
    output.files.len(),
    report.display()
  ));

  if open && let Err(e) = open_in_browser(base_dir, &report) {
    ui::warn(&format!("could not open the report: {e:#}"));
  }
  Ok(report)
}
