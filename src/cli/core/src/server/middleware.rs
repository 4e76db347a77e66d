/* src/cli/core/src/server/middleware.rs */

// Request middleware run before page requests by both servers.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::extract::Query;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use bertui_compiler::Route;
use bertui_compiler::routes::match_route;

use crate::config::{MiddlewareSection, RedirectRule};
use crate::ui::{self, DIM, RESET};

/// Terminal response produced by a middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareResponse {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: String,
}

impl IntoResponse for MiddlewareResponse {
  fn into_response(self) -> Response {
    let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(self.body));
    *response.status_mut() = status;
    append_headers(response.headers_mut(), &self.headers);
    response
  }
}

/// Insert `headers`, skipping names or values that are not valid HTTP.
pub fn append_headers(map: &mut HeaderMap, headers: &[(String, String)]) {
  for (k, v) in headers {
    if let (Ok(name), Ok(value)) = (HeaderName::try_from(k.as_str()), HeaderValue::try_from(v.as_str()))
    {
      map.insert(name, value);
    }
  }
}

/// Per-request state shared by every middleware in the chain.
#[derive(Debug, Default)]
pub struct MiddlewareContext {
  pub url: String,
  pub method: String,
  pub headers: BTreeMap<String, String>,
  /// Dynamic segments of the matched page route: `/blog/[slug]` -> `slug`.
  pub params: BTreeMap<String, String>,
  /// Route the request resolved to, `[param]` segments kept verbatim.
  pub route: Option<String>,
  /// Decoded query string.
  pub query: BTreeMap<String, String>,
  /// Free-form values passed between middlewares.
  pub locals: serde_json::Map<String, serde_json::Value>,
  pathname: String,
  response: Option<MiddlewareResponse>,
  stopped: bool,
  extra_headers: Vec<(String, String)>,
}

impl MiddlewareContext {
  pub fn new(method: &Method, uri: &Uri, headers: &HeaderMap, routes: &[Route]) -> Self {
    let query = Query::<BTreeMap<String, String>>::try_from_uri(uri).map(|Query(q)| q).unwrap_or_default();
    let (route, params) = match match_route(routes, uri.path()) {
      Some((route, params)) => (Some(route.route_path.clone()), params),
      None => (None, BTreeMap::new()),
    };
    Self {
      url: uri.to_string(),
      method: method.as_str().to_string(),
      headers: headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect(),
      params,
      route,
      query,
      pathname: uri.path().to_string(),
      ..Self::default()
    }
  }

  pub fn pathname(&self) -> &str {
    &self.pathname
  }

  pub fn stopped(&self) -> bool {
    self.stopped
  }

  /// Answer the request directly. `Content-Type` defaults to `text/html`.
  pub fn respond(&mut self, body: impl Into<String>, status: Option<u16>, headers: &[(&str, &str)]) {
    let mut all = vec![("content-type".to_string(), "text/html".to_string())];
    for (k, v) in headers {
      let k = k.to_ascii_lowercase();
      all.retain(|(existing, _)| *existing != k);
      all.push((k, v.to_string()));
    }
    self.response = Some(MiddlewareResponse { status: status.unwrap_or(200), headers: all, body: body.into() });
    self.stopped = true;
  }

  /// Redirect with `status`, 302 when `None`.
  pub fn redirect(&mut self, url: &str, status: Option<u16>) {
    self.response = Some(MiddlewareResponse {
      status: status.unwrap_or(302),
      headers: vec![(header::LOCATION.as_str().to_string(), url.to_string())],
      body: String::new(),
    });
    self.stopped = true;
  }

  /// Header added to whatever response the request ends with.
  pub fn set_header(&mut self, key: &str, value: &str) {
    self.extra_headers.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
    self.extra_headers.push((key.to_string(), value.to_string()));
  }

  pub fn extra_headers(&self) -> &[(String, String)] {
    &self.extra_headers
  }

  pub fn take_response(&mut self) -> Option<MiddlewareResponse> {
    self.response.take()
  }
}

pub trait Middleware: Send + Sync {
  fn name(&self) -> &str;

  fn on_request(&self, ctx: &mut MiddlewareContext) -> anyhow::Result<()>;

  /// Called when `on_request` fails; a response set here is sent to the client.
  fn on_error(&self, _ctx: &mut MiddlewareContext, _error: &anyhow::Error) {}
}

pub type MiddlewareChain = Vec<Box<dyn Middleware>>;

/// Run `chain` in order. Returns the terminal response, or `None` to let the
/// request through to the page handler.
pub fn run_middleware(chain: &[Box<dyn Middleware>], ctx: &mut MiddlewareContext) -> Option<MiddlewareResponse> {
  for mw in chain {
    if let Err(e) = mw.on_request(ctx) {
      ui::warn(&format!("middleware {} failed: {e:#}", mw.name()));
      mw.on_error(ctx, &e);
      return ctx.take_response();
    }
    if ctx.stopped() {
      ui::detail(&format!("{DIM}middleware {} intercepted {}{RESET}", mw.name(), ctx.pathname()));
      return ctx.take_response();
    }
  }
  None
}

/// True for requests that resolve to a page rather than a file.
pub fn is_page_request(path: &str) -> bool {
  let last = path.rsplit('/').next().unwrap_or_default();
  !last.contains('.') || last.ends_with(".html")
}

// -- Config-driven middleware --

struct Redirects(Vec<RedirectRule>);

impl Middleware for Redirects {
  fn name(&self) -> &str {
    "redirects"
  }

  fn on_request(&self, ctx: &mut MiddlewareContext) -> anyhow::Result<()> {
    let path = ctx.pathname().to_string();
    if let Some(rule) = self.0.iter().find(|r| r.from == path) {
      ctx.redirect(&rule.to, Some(rule.status));
    }
    Ok(())
  }
}

struct BlockedPaths(Vec<String>);

impl Middleware for BlockedPaths {
  fn name(&self) -> &str {
    "blocked"
  }

  fn on_request(&self, ctx: &mut MiddlewareContext) -> anyhow::Result<()> {
    let path = ctx.pathname();
    if self.0.iter().any(|prefix| path.starts_with(prefix.as_str())) {
      ctx.respond("Forbidden", Some(403), &[("content-type", "text/plain; charset=utf-8")]);
    }
    Ok(())
  }
}

struct ExtraHeaders(BTreeMap<String, String>);

impl Middleware for ExtraHeaders {
  fn name(&self) -> &str {
    "headers"
  }

  fn on_request(&self, ctx: &mut MiddlewareContext) -> anyhow::Result<()> {
    for (k, v) in &self.0 {
      ctx.set_header(k, v);
    }
    Ok(())
  }
}

/// Built-in chain from `[middleware]`: headers, then blocked prefixes, then redirects.
pub fn chain_from_config(section: &MiddlewareSection) -> MiddlewareChain {
  let mut chain: MiddlewareChain = Vec::new();
  if !section.headers.is_empty() {
    chain.push(Box::new(ExtraHeaders(section.headers.clone())));
  }
  if !section.blocked.is_empty() {
    chain.push(Box::new(BlockedPaths(section.blocked.clone())));
  }
  if !section.redirects.is_empty() {
    chain.push(Box::new(Redirects(section.redirects.clone())));
  }
  chain
}

#[cfg(test)]
mod tests {
  use bertui_compiler::RouteKind;

  use super::*;

  fn route(path: &str, kind: RouteKind) -> Route {
    Route {
      route_path: path.into(),
      source_file: format!("{path}.jsx").into(),
      absolute_path: format!("/p/src/pages{path}.jsx").into(),
      kind,
    }
  }

  fn ctx(uri: &str) -> MiddlewareContext {
    let mut headers = HeaderMap::new();
    headers.insert("x-test", HeaderValue::from_static("1"));
    let routes = [route("/search", RouteKind::Static), route("/blog/[slug]", RouteKind::Dynamic)];
    MiddlewareContext::new(&Method::GET, &uri.parse().unwrap(), &headers, &routes)
  }

  struct Failing {
    recover: bool,
  }

  impl Middleware for Failing {
    fn name(&self) -> &str {
      "failing"
    }

    fn on_request(&self, _ctx: &mut MiddlewareContext) -> anyhow::Result<()> {
      anyhow::bail!("boom")
    }

    fn on_error(&self, ctx: &mut MiddlewareContext, error: &anyhow::Error) {
      if self.recover {
        ctx.respond(format!("recovered: {error}"), Some(500), &[]);
      }
    }
  }

  struct Counter;

  impl Middleware for Counter {
    fn name(&self) -> &str {
      "counter"
    }

    fn on_request(&self, ctx: &mut MiddlewareContext) -> anyhow::Result<()> {
      let n = ctx.locals.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
      ctx.locals.insert("n".into(), (n + 1).into());
      Ok(())
    }
  }

  #[test]
  fn context_reads_request() {
    let c = ctx("/search?q=rust&page=2&flag");
    assert_eq!(c.pathname(), "/search");
    assert_eq!(c.method, "GET");
    assert_eq!(c.query.get("q").map(String::as_str), Some("rust"));
    assert_eq!(c.query.get("flag").map(String::as_str), Some(""));
    assert_eq!(c.route.as_deref(), Some("/search"));
    assert!(c.params.is_empty());
    assert_eq!(c.headers.get("x-test").map(String::as_str), Some("1"));
    assert!(!c.stopped());
  }

  #[test]
  fn query_values_are_decoded() {
    let c = ctx("/search?q=a%20b&tag=c%26d&sp=x+y");
    assert_eq!(c.query.get("q").map(String::as_str), Some("a b"));
    assert_eq!(c.query.get("tag").map(String::as_str), Some("c&d"));
    assert_eq!(c.query.get("sp").map(String::as_str), Some("x y"));
  }

  #[test]
  fn params_come_from_the_matched_route() {
    let c = ctx("/blog/hello-world?ref=home");
    assert_eq!(c.route.as_deref(), Some("/blog/[slug]"));
    assert_eq!(c.params.get("slug").map(String::as_str), Some("hello-world"));
    assert!(!c.params.contains_key("ref"));

    let c = ctx("/missing/page");
    assert!(c.route.is_none());
    assert!(c.params.is_empty());
  }

  #[test]
  fn respond_defaults_to_html_200() {
    let mut c = ctx("/");
    c.respond("<p>hi</p>", None, &[]);
    assert!(c.stopped());
    let r = c.take_response().unwrap();
    assert_eq!(r.status, 200);
    assert_eq!(r.headers, vec![("content-type".to_string(), "text/html".to_string())]);
  }

  #[test]
  fn respond_header_overrides_content_type() {
    let mut c = ctx("/");
    c.respond("{}", Some(201), &[("Content-Type", "application/json")]);
    let r = c.take_response().unwrap();
    assert_eq!(r.status, 201);
    assert_eq!(r.headers, vec![("content-type".to_string(), "application/json".to_string())]);
  }

  #[test]
  fn redirect_defaults_to_302() {
    let mut c = ctx("/old");
    c.redirect("/new", None);
    let r = c.take_response().unwrap();
    assert_eq!(r.status, 302);
    assert_eq!(r.headers, vec![("location".to_string(), "/new".to_string())]);
  }

  #[test]
  fn chain_stops_at_first_terminal_response() {
    let section = MiddlewareSection {
      redirects: vec![RedirectRule { from: "/old".into(), to: "/new".into(), status: 301 }],
      headers: BTreeMap::from([("x-frame-options".to_string(), "DENY".to_string())]),
      blocked: vec!["/admin".into()],
    };
    let chain = chain_from_config(&section);

    let mut c = ctx("/old");
    let r = run_middleware(&chain, &mut c).unwrap();
    assert_eq!(r.status, 301);
    assert_eq!(c.extra_headers(), &[("x-frame-options".to_string(), "DENY".to_string())]);

    let mut c = ctx("/admin/users");
    assert_eq!(run_middleware(&chain, &mut c).unwrap().status, 403);

    let mut c = ctx("/about");
    assert!(run_middleware(&chain, &mut c).is_none());
    assert_eq!(c.extra_headers().len(), 1);
  }

  #[test]
  fn locals_are_shared_along_the_chain() {
    let chain: MiddlewareChain = vec![Box::new(Counter), Box::new(Counter)];
    let mut c = ctx("/");
    assert!(run_middleware(&chain, &mut c).is_none());
    assert_eq!(c.locals.get("n").and_then(|v| v.as_u64()), Some(2));
  }

  #[test]
  fn error_hook_response_wins() {
    let chain: MiddlewareChain = vec![Box::new(Failing { recover: true }), Box::new(Counter)];
    let mut c = ctx("/");
    let r = run_middleware(&chain, &mut c).unwrap();
    assert_eq!(r.status, 500);
    assert_eq!(r.body, "recovered: boom");
    assert!(c.locals.is_empty());
  }

  #[test]
  fn unhandled_error_lets_request_through() {
    let chain: MiddlewareChain = vec![Box::new(Failing { recover: false }), Box::new(Counter)];
    let mut c = ctx("/");
    assert!(run_middleware(&chain, &mut c).is_none());
    assert!(c.locals.is_empty());
  }

  #[test]
  fn page_requests() {
    assert!(is_page_request("/"));
    assert!(is_page_request("/about"));
    assert!(is_page_request("/about/index.html"));
    assert!(!is_page_request("/assets/main-1.js"));
    assert!(!is_page_request("/favicon.ico"));
  }

  #[test]
  fn response_conversion_keeps_headers() {
    let r = MiddlewareResponse {
      status: 307,
      headers: vec![("location".into(), "/x".into()), ("bad header".into(), "v".into())],
      body: String::new(),
    }
    .into_response();
    assert_eq!(r.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(r.headers().get("location").unwrap(), "/x");
    assert_eq!(r.headers().len(), 1);
  }
}
