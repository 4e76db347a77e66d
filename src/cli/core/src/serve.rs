/* src/cli/core/src/serve.rs */

// `bertui serve`: static preview of the production output with SPA fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use bertui_compiler::Route;
use bertui_compiler::routes::discover_routes;
use tokio::signal;

use crate::config::BertuiConfig;
use crate::server::files::{file_response, safe_join};
use crate::server::middleware::{
  MiddlewareChain, MiddlewareContext, append_headers, chain_from_config, is_page_request,
  run_middleware,
};
use crate::server::mime::cache_control_for;
use crate::ui::{self, DIM, RESET};

const PREVIEW_HEADER: &str = "x-bertui-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
  File(PathBuf),
  /// Extension-less miss answered with the root `index.html`.
  SpaFallback(PathBuf),
  NotFound,
}

/// Map a request path onto a file under `dist`.
pub fn resolve_request(dist: &Path, request_path: &str) -> Resolved {
  let Some(target) = safe_join(dist, request_path) else {
    return Resolved::NotFound;
  };
  if target.is_dir() {
    let index = target.join("index.html");
    if index.is_file() {
      return Resolved::File(index);
    }
  } else if target.is_file() {
    return Resolved::File(target);
  }
  let last = request_path.rsplit('/').next().unwrap_or_default();
  let index = dist.join("index.html");
  if !last.contains('.') && index.is_file() {
    return Resolved::SpaFallback(index);
  }
  Resolved::NotFound
}

struct PreviewState {
  dist: PathBuf,
  /// Page routes of the project, for middleware params.
  routes: Vec<Route>,
  middleware: MiddlewareChain,
}

async fn handle(State(state): State<Arc<PreviewState>>, req: Request<Body>) -> Response {
  let path = req.uri().path().to_string();
  let mut ctx = MiddlewareContext::new(req.method(), req.uri(), req.headers(), &state.routes);
  if is_page_request(&path)
    && let Some(intercepted) = run_middleware(&state.middleware, &mut ctx)
  {
    let mut response = intercepted.into_response();
    append_headers(response.headers_mut(), ctx.extra_headers());
    return response;
  }

  let (file, kind) = match resolve_request(&state.dist, &path) {
    Resolved::File(file) => (file, "static"),
    Resolved::SpaFallback(file) => (file, "spa-fallback"),
    Resolved::NotFound => return (StatusCode::NOT_FOUND, "Not Found").into_response(),
  };
  let Some(mut response) = file_response(&file, None, cache_control_for(&file)).await else {
    return (StatusCode::NOT_FOUND, "Not Found").into_response();
  };
  response.headers_mut().insert(PREVIEW_HEADER, HeaderValue::from_static(kind));
  append_headers(response.headers_mut(), ctx.extra_headers());
  response
}

fn router(dist: PathBuf, routes: Vec<Route>, middleware: MiddlewareChain) -> Router {
  Router::new().fallback(handle).with_state(Arc::new(PreviewState { dist, routes, middleware }))
}

/// Routes of the project's `src/pages`, empty when the sources are not around.
fn project_routes(base_dir: &Path) -> Vec<Route> {
  let pages = base_dir.join("src").join("pages");
  if !pages.is_dir() {
    return Vec::new();
  }
  discover_routes(&pages).unwrap_or_else(|e| {
    ui::warn(&format!("middleware params unavailable: {e}"));
    Vec::new()
  })
}

pub async fn run_serve(
  config: &BertuiConfig,
  base_dir: &Path,
  port: Option<u16>,
  dir: Option<&str>,
) -> Result<()> {
  let dist = base_dir.join(dir.unwrap_or(&config.serve.dir));
  if !dist.join("index.html").is_file() {
    bail!("{} has no index.html -- run `bertui build` first", dist.display());
  }
  let port = port.unwrap_or(config.serve.port);

  ui::banner("serve", Some(config.project_name()));
  let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
  ui::arrow(&format!("preview: http://localhost:{port}"));
  ui::detail(&format!("{DIM}serving {} \u{00b7} Ctrl+C to stop{RESET}", dist.display()));
  ui::blank();

  let app = router(dist, project_routes(base_dir), chain_from_config(&config.middleware));
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = signal::ctrl_c().await;
      println!();
      println!("  {DIM}shutting down...{RESET}");
    })
    .await?;
  Ok(())
}
