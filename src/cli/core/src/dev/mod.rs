/* src/cli/core/src/dev/mod.rs */

// `bertui dev`: compile once, serve, then recompile on every source change
// with at most one recompile in flight.

mod network;
mod recompile;
mod reload;
mod server;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bertui_compiler::ContentCache;
use bertui_compiler::cache::CLEANUP_INTERVAL;
use bertui_compiler::env::load_env_variables;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::signal;
use tokio::sync::mpsc;

pub use self::recompile::DEV_DIR;

use self::network::find_available_port;
use self::recompile::{Recompiler, is_relevant, process_batch};
use self::reload::ReloadHub;
use self::server::{DevState, router};
use crate::config::BertuiConfig;
use crate::server::middleware::chain_from_config;
use crate::transpile::CommandTranspiler;
use crate::ui::{self, DIM, RESET};

fn setup_watcher() -> Result<(RecommendedWatcher, mpsc::Receiver<PathBuf>)> {
  let (tx, rx) = mpsc::channel(64);
  let watcher = RecommendedWatcher::new(
    move |res: std::result::Result<notify::Event, notify::Error>| {
      if let Ok(event) = res {
        for path in event.paths.into_iter().filter(|p| is_relevant(p)) {
          // A full queue already guarantees another recompile.
          let _ = tx.try_send(path);
        }
      }
    },
    notify::Config::default(),
  )?;
  Ok((watcher, rx))
}

pub async fn run_dev(config: &BertuiConfig, base_dir: &Path, port: Option<u16>) -> Result<()> {
  ui::banner("dev", Some(config.project_name()));

  let transpiler = CommandTranspiler::new(base_dir, config.build.transpiler_command.as_deref());
  transpiler.check_available()?;
  let env = load_env_variables(std::env::vars(), &config.env.prefixes);
  let cache = Arc::new(ContentCache::default());
  let recompiler = Arc::new(Recompiler::new(base_dir, Box::new(transpiler), env, Arc::clone(&cache)));

  let initial = {
    let rc = Arc::clone(&recompiler);
    tokio::task::spawn_blocking(move || rc.compile()).await?
  };
  match initial {
    Ok(summary) => ui::ok(&format!(
      "compiled {} files \u{00b7} {} routes \u{00b7} {} islands in {}ms",
      summary.files,
      summary.routes,
      summary.islands,
      summary.duration.as_millis()
    )),
    Err(diagnostics) => {
      for d in &diagnostics {
        ui::fail(d);
      }
      ui::warn("initial compile failed; fix the errors above and save to retry");
    }
  }

  let hub = ReloadHub::default();
  let state = DevState::new(
    config,
    base_dir,
    recompiler.live().clone(),
    chain_from_config(&config.middleware),
    hub.clone(),
  );
  let port = find_available_port(port.unwrap_or(config.dev.port))?;
  let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
  let server = tokio::spawn(async move { axum::serve(listener, router(state)).await });

  let (mut watcher, mut watcher_rx) = setup_watcher()?;
  let src_dir = base_dir.join("src");
  if src_dir.exists() {
    watcher.watch(&src_dir, RecursiveMode::Recursive)?;
  }

  ui::blank();
  ui::arrow(&format!("local:   http://localhost:{port}"));
  ui::detail(&format!("{DIM}watching src/ \u{00b7} Ctrl+C to stop{RESET}"));
  ui::blank();

  let debounce = Duration::from_millis(config.dev.debounce_ms);
  let mut sweep = tokio::time::interval(CLEANUP_INTERVAL);
  sweep.tick().await;

  loop {
    tokio::select! {
      _ = signal::ctrl_c() => {
        println!();
        println!("  {DIM}shutting down...{RESET}");
        break;
      }
      _ = sweep.tick() => {
        let removed = cache.cleanup_expired();
        if removed > 0 {
          ui::dev_line(DIM, &format!("cache: {removed} expired entries removed"));
        }
      }
      Some(first) = watcher_rx.recv() => {
        process_batch(&mut watcher_rx, first, &recompiler, &hub, &src_dir, debounce).await;
      }
    }
  }

  server.abort();
  cache.dispose();
  Ok(())
}
