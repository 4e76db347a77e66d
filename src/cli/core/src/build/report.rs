/* src/cli/core/src/build/report.rs */

// Terminal rendering of compile reports, shared by build and dev.

use bertui_compiler::{CacheStats, CompileReport, HydrationReport};

use crate::ui::{self, CYAN, DIM, RESET, YELLOW};

pub fn print_compile_report(report: &CompileReport) {
  ui::detail_ok(&format!(
    "{} files compiled{}",
    report.files,
    if report.skipped > 0 { format!(" {DIM}({} skipped){RESET}", report.skipped) } else { String::new() }
  ));
  ui::detail_ok(&format!("{} routes found", report.routes.len()));
  for path in &report.shadowed {
    ui::detail_warn(&format!("{} shadowed by an earlier page with the same route", path.display()));
  }
  if !report.layouts.is_empty() {
    ui::detail(&format!("{DIM}{} layouts{RESET}", report.layouts.len()));
  }
  if !report.loading.is_empty() {
    ui::detail(&format!("{DIM}{} loading states{RESET}", report.loading.len()));
  }
  for island in &report.islands {
    ui::detail(&format!(
      "{CYAN}island{RESET} {} {DIM}{}{RESET}",
      island.route_path,
      island.source_file.display()
    ));
  }
  for (route, reason) in &report.island_rejections {
    ui::detail_warn(&format!("{route}: server island rejected ({reason}), rendering on the client"));
  }
}

pub fn print_hydration_report(report: &HydrationReport) {
  ui::detail(&format!(
    "{} static {DIM}(zero JS){RESET} \u{00b7} {} interactive",
    report.static_routes.len(),
    report.interactive_routes.len()
  ));
  for (route, features) in &report.interactive_routes {
    let names = if features.is_empty() { "unreadable source".to_string() } else { features.join(", ") };
    ui::detail(&format!("{YELLOW}{route}{RESET} {DIM}{names}{RESET}"));
  }
}

pub fn print_cache_stats(stats: &CacheStats) {
  let lookups = stats.hits + stats.misses;
  if lookups == 0 {
    return;
  }
  ui::detail(&format!(
    "{DIM}cache: {:.0}% hit rate ({}/{lookups}), {} entries, {} evictions{RESET}",
    stats.hit_rate * 100.0,
    stats.hits,
    stats.size,
    stats.evictions,
  ));
}
