/* src/cli/core/src/server/mime.rs */

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const IMMUTABLE: &str = "public, max-age=31536000, immutable";
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico"];

fn extension(path: &Path) -> Option<String> {
  path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

pub fn content_type_for(path: &Path) -> &'static str {
  match extension(path).as_deref() {
    Some("html") => "text/html; charset=utf-8",
    Some("css") => "text/css; charset=utf-8",
    Some("js" | "mjs") => "application/javascript; charset=utf-8",
    Some("json" | "map") => "application/json; charset=utf-8",
    Some("png") => "image/png",
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("svg") => "image/svg+xml",
    Some("webp") => "image/webp",
    Some("avif") => "image/avif",
    Some("ico") => "image/x-icon",
    Some("woff") => "font/woff",
    Some("woff2") => "font/woff2",
    Some("ttf") => "font/ttf",
    Some("otf") => "font/otf",
    Some("txt") => "text/plain; charset=utf-8",
    Some("xml") => "application/xml; charset=utf-8",
    Some("pdf") => "application/pdf",
    _ => DEFAULT_CONTENT_TYPE,
  }
}

/// Hashed bundle output and images never change under the same name.
pub fn is_static_asset(path: &Path) -> bool {
  match extension(path) {
    Some(ext) => ext == "js" || ext == "css" || IMAGE_EXTENSIONS.contains(&ext.as_str()),
    None => false,
  }
}

pub fn cache_control_for(path: &Path) -> &'static str {
  if is_static_asset(path) { IMMUTABLE } else { NO_CACHE }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_and_unknown_types() {
    assert_eq!(content_type_for(Path::new("a/index.html")), "text/html; charset=utf-8");
    assert_eq!(content_type_for(Path::new("main-1.JS")), "application/javascript; charset=utf-8");
    assert_eq!(content_type_for(Path::new("main-1.js.map")), "application/json; charset=utf-8");
    assert_eq!(content_type_for(Path::new("font.woff2")), "font/woff2");
    assert_eq!(content_type_for(Path::new("archive.tar.gz")), DEFAULT_CONTENT_TYPE);
    assert_eq!(content_type_for(Path::new("LICENSE")), DEFAULT_CONTENT_TYPE);
  }

  #[test]
  fn caching_policy() {
    assert_eq!(cache_control_for(Path::new("assets/main-abc.js")), IMMUTABLE);
    assert_eq!(cache_control_for(Path::new("styles/bertui.min.css")), IMMUTABLE);
    assert_eq!(cache_control_for(Path::new("images/logo.webp")), IMMUTABLE);
    assert_eq!(cache_control_for(Path::new("index.html")), NO_CACHE);
    assert_eq!(cache_control_for(Path::new("fonts/a.woff2")), NO_CACHE);
  }
}
