/* src/cli/core/src/build/sitemap.rs */

use bertui_compiler::{Route, RouteKind};

use super::html::escape_html;

/// `sitemap.xml` listing every static route under `base_url`.
pub fn generate_sitemap(base_url: &str, routes: &[Route]) -> String {
  let base = base_url.trim_end_matches('/');
  let mut xml = String::from(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
  );
  for route in routes.iter().filter(|r| r.kind == RouteKind::Static) {
    let priority = if route.route_path == "/" { "1.0" } else { "0.8" };
    xml.push_str(&format!(
      "  <url>\n    <loc>{}{}</loc>\n    <changefreq>weekly</changefreq>\n    <priority>{priority}</priority>\n  </url>\n",
      escape_html(base),
      escape_html(&route.route_path),
    ));
  }
  xml.push_str("</urlset>\n");
  xml
}

/// `robots.txt` allowing everything except `disallow`, pointing at the sitemap.
pub fn generate_robots(base_url: &str, disallow: &[String]) -> String {
  let mut out = String::from("User-agent: *\nAllow: /\n");
  for path in disallow {
    out.push_str(&format!("Disallow: {path}\n"));
  }
  out.push_str(&format!("\nSitemap: {}/sitemap.xml\n", base_url.trim_end_matches('/')));
  out
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;

  fn route(path: &str, kind: RouteKind) -> Route {
    Route {
      route_path: path.into(),
      source_file: PathBuf::from("x.jsx"),
      absolute_path: PathBuf::from("/p/src/pages/x.jsx"),
      kind,
    }
  }

  #[test]
  fn sitemap_lists_static_routes_only() {
    let routes = vec![
      route("/", RouteKind::Static),
      route("/about", RouteKind::Static),
      route("/blog/[slug]", RouteKind::Dynamic),
    ];
    let xml = generate_sitemap("https://example.com/", &routes);
    assert!(xml.contains("<loc>https://example.com/</loc>"));
    assert!(xml.contains("<loc>https://example.com/about</loc>"));
    assert!(!xml.contains("[slug]"));
    assert_eq!(xml.matches("<url>").count(), 2);
    assert!(xml.contains("<priority>1.0</priority>"));
  }

  #[test]
  fn robots_has_disallow_and_sitemap() {
    let txt = generate_robots("https://example.com", &["/admin".to_string()]);
    assert_eq!(
      txt,
      "User-agent: *\nAllow: /\nDisallow: /admin\n\nSitemap: https://example.com/sitemap.xml\n"
    );
  }
}
