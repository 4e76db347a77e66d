/* src/cli/core/src/dev/server.rs */

// Dev HTTP server: HTML shell, compiled modules, styles, images, public
// files and the `/__hmr` live-reload socket.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use super::recompile::{DEV_STYLESHEET, LiveOutput};
use super::reload::{ReloadHub, ReloadMessage};
use crate::build::html::{Document, import_map};
use crate::config::BertuiConfig;
use crate::server::middleware::{
  MiddlewareChain, MiddlewareContext, append_headers, is_page_request, run_middleware,
};
use crate::server::files::{file_response, safe_join};

const HMR_CLIENT: &str = r#"const ws = new WebSocket(`${location.protocol === 'https:' ? 'wss' : 'ws'}://${location.host}/__hmr`);
ws.onopen = () => console.log('%c[bertui] hot reload connected', 'color: #10b981; font-weight: bold');
ws.onmessage = (event) => {
  const data = JSON.parse(event.data);
  if (data.type === 'recompiling') console.log('%c[bertui] recompiling...', 'color: #3b82f6');
  if (data.type === 'reload') window.location.reload();
  if (data.type === 'error') console.error('[bertui] compile error\n' + data.message);
};
"#;

pub(super) struct DevState {
  shell_html: String,
  live: LiveOutput,
  images_dir: PathBuf,
  public_dir: PathBuf,
  middleware: MiddlewareChain,
  hub: ReloadHub,
}

impl DevState {
  pub fn new(
    config: &BertuiConfig,
    root: &Path,
    live: LiveOutput,
    middleware: MiddlewareChain,
    hub: ReloadHub,
  ) -> Self {
    Self {
      shell_html: dev_shell_html(config),
      live,
      images_dir: root.join("src").join("images"),
      public_dir: root.join("public"),
      middleware,
      hub,
    }
  }
}

/// Single client-rendered document used for every page in dev.
pub(super) fn dev_shell_html(config: &BertuiConfig) -> String {
  Document {
    meta: Some(&config.meta),
    stylesheets: vec![format!("/styles/{DEV_STYLESHEET}")],
    import_map: Some(import_map(&config.build.externals)),
    loading_screen: None,
    root_html: "",
    module_scripts: vec!["/hmr-client.js".into(), "/compiled/main.js".into()],
    body_extra: None,
  }
  .render()
}

async fn serve_file(path: Option<PathBuf>, content_type: Option<&str>, cache_control: &'static str) -> Response {
  match path {
    Some(path) => file_response(&path, content_type, cache_control).await.unwrap_or_else(not_found),
    None => not_found(),
  }
}

fn not_found() -> Response {
  (StatusCode::NOT_FOUND, "Not found").into_response()
}

async fn compiled(State(state): State<Arc<DevState>>, UrlPath(rel): UrlPath<String>) -> Response {
  let path = state.live.compiled_dir().and_then(|dir| safe_join(&dir, &rel));
  let js = path.as_ref().is_some_and(|p| p.extension().is_some_and(|e| e == "js"));
  let content_type = js.then_some("application/javascript; charset=utf-8");
  serve_file(path, content_type, "no-store").await
}

async fn styles(State(state): State<Arc<DevState>>, UrlPath(rel): UrlPath<String>) -> Response {
  let path = state.live.styles_dir().and_then(|dir| safe_join(&dir, &rel));
  serve_file(path, Some("text/css; charset=utf-8"), "no-store").await
}

async fn hmr_client() -> impl IntoResponse {
  ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], HMR_CLIENT)
}

async fn hmr_socket(State(state): State<Arc<DevState>>, ws: WebSocketUpgrade) -> Response {
  let rx = state.hub.subscribe();
  ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(socket: WebSocket, mut rx: broadcast::Receiver<ReloadMessage>) {
  let (mut sender, mut receiver) = socket.split();
  loop {
    tokio::select! {
      msg = rx.recv() => match msg {
        Ok(msg) => {
          if sender.send(Message::Text(msg.to_json().into())).await.is_err() {
            break;
          }
        }
        Err(broadcast::error::RecvError::Lagged(_)) => continue,
        Err(broadcast::error::RecvError::Closed) => break,
      },
      incoming = receiver.next() => match incoming {
        Some(Ok(Message::Close(_)) | Err(_)) | None => break,
        Some(Ok(_)) => {}
      },
    }
  }
}

/// Pages get the shell (after middleware); anything else is looked up in
/// `public/`.
async fn fallback(State(state): State<Arc<DevState>>, req: Request<Body>) -> Response {
  let path = req.uri().path().to_string();
  if !is_page_request(&path) {
    return serve_file(safe_join(&state.public_dir, &path), None, "no-cache").await;
  }
  let routes = state.live.routes();
  let mut ctx = MiddlewareContext::new(req.method(), req.uri(), req.headers(), &routes);
  let mut response = match run_middleware(&state.middleware, &mut ctx) {
    Some(intercepted) => intercepted.into_response(),
    None => {
      let mut response = Response::new(Body::from(state.shell_html.clone()));
      response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
      response
    }
  };
  append_headers(response.headers_mut(), ctx.extra_headers());
  response
}

pub(super) fn router(state: DevState) -> Router {
  let images = ServeDir::new(&state.images_dir);
  let public = ServeDir::new(&state.public_dir);
  Router::new()
    .route("/__hmr", get(hmr_socket))
    .route("/hmr-client.js", get(hmr_client))
    .route("/compiled/{*path}", get(compiled))
    .route("/styles/{*path}", get(styles))
    .nest_service("/images", images)
    .nest_service("/public", public)
    .fallback(fallback)
    .with_state(Arc::new(state))
}
