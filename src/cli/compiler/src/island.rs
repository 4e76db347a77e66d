/* src/cli/compiler/src/island.rs */

// Server-island HTML extraction: validate the page, then literalize the
// first `return ( ... )` JSX expression with a fixed set of text rewrites.
// Anything the rewrites do not cover is left in place.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::ROUTER_SPECIFIER;
use crate::classify::{MarkerKind, markers_of};
use crate::error::IslandRejection;

/// Elements that stay self-closing in the output.
pub const VOID_ELEMENTS: &[&str] = &[
  "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
  "wbr",
];

fn return_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\breturn\s*\(").unwrap())
}

fn router_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(&format!(r#"from\s+['"]{}['"]"#, regex::escape(ROUTER_SPECIFIER))).unwrap()
  })
}

fn jsx_comment_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\{\s*/\*[\s\S]*?\*/\s*\}").unwrap())
}

fn class_name_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\b(className|htmlFor)=").unwrap())
}

fn style_object_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"style=\{\{([^{}]*)\}\}").unwrap())
}

fn self_closing_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"<([A-Za-z][\w.-]*)([^<>]*?)\s*/>").unwrap())
}

fn string_container_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r#"(=)?\{\s*(?:`([^`$]*)`|"([^"]*)"|'([^']*)'|(-?\d+))\s*\}"#).unwrap()
  })
}

fn fragment_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"</?>").unwrap())
}

fn call_re(name: &str) -> Regex {
  Regex::new(&format!(r"\b{}\s*\(", regex::escape(name))).unwrap()
}

fn attr_re(name: &str) -> Regex {
  Regex::new(&format!(r"\b{}\s*=", regex::escape(name))).unwrap()
}

#[derive(Clone, Copy)]
enum Scan {
  Code,
  Text,
}

/// Index of the closing quote of the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
  let quote = bytes[start];
  let mut i = start + 1;
  while i < bytes.len() {
    match bytes[i] {
      b'\\' => i += 1,
      b if b == quote => return i,
      _ => {}
    }
    i += 1;
  }
  bytes.len()
}

/// Index of the `}` closing the brace at `start`.
fn skip_braces(bytes: &[u8], start: usize) -> usize {
  let mut depth = 0usize;
  let mut i = start;
  while i < bytes.len() {
    match bytes[i] {
      b'"' | b'\'' | b'`' => i = skip_string(bytes, i),
      b'{' => depth += 1,
      b'}' => {
        depth -= 1;
        if depth == 0 {
          return i;
        }
      }
      _ => {}
    }
    i += 1;
  }
  bytes.len()
}

/// Index of the `>` ending the tag opened at `start`.
fn skip_tag(bytes: &[u8], start: usize) -> usize {
  let mut i = start + 1;
  while i < bytes.len() {
    match bytes[i] {
      b'"' | b'\'' => i = skip_string(bytes, i),
      b'{' => i = skip_braces(bytes, i),
      b'>' => return i,
      _ => {}
    }
    i += 1;
  }
  bytes.len()
}

fn opens_tag(bytes: &[u8], i: usize) -> bool {
  bytes.get(i + 1).is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/' || b == b'>')
}

/// Matching `)` for the paren at `open`. Parens in JSX text, string
/// literals and tag attributes do not count.
fn matching_paren(source: &str, open: usize) -> Option<usize> {
  let bytes = source.as_bytes();
  let mut parens = 0usize;
  let mut elements = 0usize;
  let mut state = Scan::Code;
  let mut i = open;
  while i < bytes.len() {
    let b = bytes[i];
    if b == b'<' && opens_tag(bytes, i) {
      let closing = bytes[i + 1] == b'/';
      let end = skip_tag(bytes, i);
      let self_closing = end > 0 && bytes.get(end - 1) == Some(&b'/') && !closing;
      if closing {
        elements = elements.saturating_sub(1);
      } else if !self_closing {
        elements += 1;
      }
      state = if elements > 0 { Scan::Text } else { Scan::Code };
      i = end + 1;
      continue;
    }
    match (state, b) {
      (Scan::Text, b'{') => i = skip_braces(bytes, i),
      (Scan::Text, _) => {}
      (Scan::Code, b'"' | b'\'' | b'`') => i = skip_string(bytes, i),
      (Scan::Code, b'(') => parens += 1,
      (Scan::Code, b')') => {
        parens -= 1;
        if parens == 0 {
          return Some(i);
        }
      }
      (Scan::Code, _) => {}
    }
    i += 1;
  }
  None
}

/// Byte span of the first `return ( ... )`: (start of `return`, index of
/// the opening paren, index of the matching closing paren). The closing
/// paren must end the statement.
fn return_span(source: &str) -> Result<(usize, usize, usize), IslandRejection> {
  let m = return_re().find(source).ok_or(IslandRejection::NoReturnExpression)?;
  let open = m.end() - 1;
  let close = matching_paren(source, open).ok_or(IslandRejection::UnbalancedReturn)?;
  let rest = source[close + 1..].trim_start();
  if !(rest.is_empty() || rest.starts_with(';') || rest.starts_with('}')) {
    return Err(IslandRejection::UnbalancedReturn);
  }
  Ok((m.start(), open, close))
}

/// Check a server-island module against the extraction rules.
pub fn validate_island(source: &str) -> Result<(), IslandRejection> {
  let (start, open, close) = return_span(source)?;
  let before = &source[..start];
  let jsx = &source[open + 1..close];

  if let Some(name) = markers_of(MarkerKind::Event).find(|name| attr_re(name).is_match(jsx)) {
    return Err(IslandRejection::EventHandler { name: name.to_string() });
  }
  if let Some(name) = markers_of(MarkerKind::Hook).find(|name| call_re(name).is_match(before)) {
    return Err(IslandRejection::HookCall { name: name.to_string() });
  }
  if router_import_re().is_match(before) {
    return Err(IslandRejection::RouterImport);
  }
  Ok(())
}

/// `backgroundColor` -> `background-color`
fn kebab_case(key: &str) -> String {
  let mut out = String::with_capacity(key.len() + 4);
  for c in key.chars() {
    if c.is_ascii_uppercase() {
      out.push('-');
      out.push(c.to_ascii_lowercase());
    } else {
      out.push(c);
    }
  }
  out
}

/// Split on commas outside parentheses: `a: rgb(1, 2, 3), b: 4` -> 2 parts.
fn split_top_level(body: &str) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut depth = 0i32;
  let mut start = 0;
  for (i, c) in body.char_indices() {
    match c {
      '(' => depth += 1,
      ')' => depth -= 1,
      ',' if depth == 0 => {
        parts.push(&body[start..i]);
        start = i + 1;
      }
      _ => {}
    }
  }
  parts.push(&body[start..]);
  parts
}

/// `{{ fontSize: '2rem', color: "red" }}` body -> `font-size: 2rem; color: red`
pub fn style_object_to_css(body: &str) -> String {
  split_top_level(body)
    .into_iter()
    .filter_map(|entry| {
      let (key, value) = entry.split_once(':')?;
      let key = key.trim().trim_matches(|c| c == '\'' || c == '"');
      let value: String =
        value.trim().chars().filter(|c| !matches!(c, '\'' | '"' | '`')).collect();
      (!key.is_empty()).then(|| format!("{}: {}", kebab_case(key), value.trim()))
    })
    .collect::<Vec<_>>()
    .join("; ")
}

fn escape_attr(value: &str) -> String {
  value.replace('&', "&amp;").replace('"', "&quot;")
}

fn escape_text(value: &str) -> String {
  value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Literalize a JSX fragment (already validated).
pub fn jsx_to_html(jsx: &str) -> String {
  let html = jsx_comment_re().replace_all(jsx, "");
  let html = class_name_re().replace_all(&html, |caps: &Captures<'_>| {
    if &caps[1] == "className" { "class=".to_string() } else { "for=".to_string() }
  });
  let html = style_object_re().replace_all(&html, |caps: &Captures<'_>| {
    format!("style=\"{}\"", escape_attr(&style_object_to_css(&caps[1])))
  });
  let html = self_closing_re().replace_all(&html, |caps: &Captures<'_>| {
    let tag = &caps[1];
    let attrs = &caps[2];
    if VOID_ELEMENTS.contains(&tag) {
      format!("<{tag}{attrs} />")
    } else {
      format!("<{tag}{attrs}></{tag}>")
    }
  });
  let html = string_container_re().replace_all(&html, |caps: &Captures<'_>| {
    let text = (2..=5).find_map(|i| caps.get(i)).map(|m| m.as_str()).unwrap_or_default();
    if caps.get(1).is_some() { format!("=\"{}\"", escape_attr(text)) } else { escape_text(text) }
  });
  let html = fragment_re().replace_all(&html, "");
  html.trim().to_string()
}

/// Static HTML for a server-island page, or the rule it violates.
pub fn extract_static_html(source: &str) -> Result<String, IslandRejection> {
  validate_island(source)?;
  let (_, open, close) = return_span(source)?;
  Ok(jsx_to_html(&source[open + 1..close]))
}
