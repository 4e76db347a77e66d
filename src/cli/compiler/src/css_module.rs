/* src/cli/compiler/src/css_module.rs */

// Per-file class scoping for `*.module.css`: `.title` -> `.title_k3x9a`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::hash::short_hash;

/// Double extension that opts a stylesheet into class scoping.
pub const CSS_MODULE_SUFFIX: &str = ".module.css";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssModuleMapping {
  pub source_file: PathBuf,
  /// original class -> scoped class
  pub class_map: BTreeMap<String, String>,
  pub scoped_css: String,
}

impl CssModuleMapping {
  /// ES module exporting the class map as its default export.
  pub fn to_module_source(&self) -> String {
    let json = serde_json::to_string_pretty(&self.class_map).unwrap_or_else(|_| "{}".into());
    format!("const styles = {json};\nexport default styles;\n")
  }
}

pub fn is_css_module(name: &str) -> bool {
  name.ends_with(CSS_MODULE_SUFFIX)
}

fn class_selector_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\.(-?[A-Za-z_][A-Za-z0-9_-]*)").unwrap())
}

fn is_selector_terminator(c: char) -> bool {
  c.is_whitespace() || matches!(c, '{' | ':' | '.' | ',' | '>' | '+' | '~' | '[' | ')')
}

// A match sits in a selector when the next structural char is `{`;
// `;` or `}` first means it is inside a declaration (e.g. `url(a.png)`).
fn in_selector_position(css: &str, from: usize) -> bool {
  css[from..].find(['{', ';', '}']).is_some_and(|i| css.as_bytes()[from + i] == b'{')
}

/// Scoped name for one class. Pure function of (filename, class).
pub fn scoped_class_name(filename: &str, class: &str) -> String {
  format!("{class}_{}", short_hash(&format!("{filename}{class}")))
}

/// Byte spans `(dot_start, name_end)` and names of every class selector.
fn class_occurrences(css: &str) -> Vec<(usize, usize, &str)> {
  let mut found = Vec::new();
  for caps in class_selector_re().captures_iter(css) {
    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
      continue;
    };
    let terminated = css[whole.end()..].chars().next().is_none_or(is_selector_terminator);
    if terminated && in_selector_position(css, whole.end()) {
      found.push((whole.start(), whole.end(), name.as_str()));
    }
  }
  found
}

/// Scope every class selector in `css`. Returns the class map and the
/// rewritten stylesheet. Selectors inside string literals are not
/// detected; that is a known limitation of the text scan.
pub fn scope_css(css: &str, filename: &str) -> (BTreeMap<String, String>, String) {
  let occurrences = class_occurrences(css);

  let mut class_map = BTreeMap::new();
  for &(_, _, name) in &occurrences {
    class_map.entry(name.to_string()).or_insert_with(|| scoped_class_name(filename, name));
  }

  let mut out = String::with_capacity(css.len() + occurrences.len() * 8);
  let mut cursor = 0;
  for &(start, end, name) in &occurrences {
    out.push_str(&css[cursor..start]);
    out.push('.');
    out.push_str(&class_map[name]);
    cursor = end;
  }
  out.push_str(&css[cursor..]);

  (class_map, out)
}

/// Convenience wrapper producing a [`CssModuleMapping`].
pub fn scope_module(css: &str, filename: &str, source_file: PathBuf) -> CssModuleMapping {
  let (class_map, scoped_css) = scope_css(css, filename);
  CssModuleMapping { source_file, class_map, scoped_css }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CARD: &str = ".title { color: red; }\n.box:hover .title, .box > p { margin: 0; }\n";

  #[test]
  fn scopes_two_distinct_classes() {
    let (map, _) = scope_css(CARD, "card.module.css");
    assert_eq!(map.len(), 2);
    assert_ne!(map["title"], map["box"]);
    assert!(map["title"].starts_with("title_"));
    assert!(map["box"].starts_with("box_"));
  }

  #[test]
  fn scoping_is_deterministic() {
    let (a, css_a) = scope_css(CARD, "card.module.css");
    let (b, css_b) = scope_css(CARD, "card.module.css");
    assert_eq!(a, b);
    assert_eq!(css_a, css_b);
  }

  #[test]
  fn every_occurrence_is_rewritten() {
    let (map, css) = scope_css(CARD, "card.module.css");
    let title = format!(".{}", map["title"]);
    assert_eq!(css.matches(&title).count(), 2);
    assert!(!css.contains(".title "));
    assert!(!css.contains(".box:"));
  }

  #[test]
  fn different_files_get_different_names() {
    let a = scoped_class_name("a.module.css", "title");
    let b = scoped_class_name("b.module.css", "title");
    assert_ne!(a, b);
  }

  #[test]
  fn declaration_values_untouched() {
    let css = ".hero { background: url(./img.png); width: 1.5rem; }";
    let (map, out) = scope_css(css, "hero.module.css");
    assert_eq!(map.len(), 1);
    assert!(out.contains("url(./img.png)"));
    assert!(out.contains("1.5rem"));
  }

  #[test]
  fn compound_and_media_selectors() {
    let css = "@media (max-width: 600px) { .a.b { x: y; } }\n.a{}";
    let (map, out) = scope_css(css, "m.module.css");
    assert_eq!(map.len(), 2);
    assert!(out.contains(&format!(".{}.{} {{", map["a"], map["b"])));
    assert!(out.ends_with(&format!(".{}{{}}", map["a"])));
  }

  #[test]
  fn prefix_class_is_not_confused() {
    let css = ".btn { } .btn-primary { }";
    let (map, out) = scope_css(css, "b.module.css");
    assert_eq!(map.len(), 2);
    assert!(out.contains(&format!(".{} ", map["btn-primary"])));
  }

  #[test]
  fn module_source_exports_map() {
    let m = scope_module(".title{}", "t.module.css", PathBuf::from("t.module.css"));
    let src = m.to_module_source();
    assert!(src.contains("\"title\""));
    assert!(src.ends_with("export default styles;\n"));
  }

  #[test]
  fn detects_module_suffix() {
    assert!(is_css_module("card.module.css"));
    assert!(!is_css_module("card.css"));
  }
}
