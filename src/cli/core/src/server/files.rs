/* src/cli/core/src/server/files.rs */

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{HeaderValue, header};
use axum::response::Response;

use super::mime::content_type_for;

/// Join `rel` under `dir`, refusing anything that escapes it.
pub fn safe_join(dir: &Path, rel: &str) -> Option<PathBuf> {
  let rel = Path::new(rel.trim_start_matches('/'));
  if rel.components().all(|c| matches!(c, Component::Normal(_))) {
    Some(dir.join(rel))
  } else {
    None
  }
}

/// Read `path` into a response; `None` when it cannot be read.
/// `content_type` overrides the extension-based type.
pub async fn file_response(
  path: &Path,
  content_type: Option<&str>,
  cache_control: &'static str,
) -> Option<Response> {
  let bytes = tokio::fs::read(path).await.ok()?;
  let content_type = content_type.unwrap_or_else(|| content_type_for(path));
  let mut response = Response::new(Body::from(bytes));
  let headers = response.headers_mut();
  if let Ok(v) = HeaderValue::from_str(content_type) {
    headers.insert(header::CONTENT_TYPE, v);
  }
  headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
  Some(response)
}
