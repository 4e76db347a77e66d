/* src/cli/compiler/src/env.rs */

// Build-time environment exposure. Only prefixed variables are visible to
// client code; everything else stays out of generated output.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn env_ref_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"\bprocess\.env\.([A-Za-z_][A-Za-z0-9_]*)\b").unwrap())
}

/// Keep variables whose name starts with one of `prefixes`.
pub fn load_env_variables<I, K, V>(vars: I, prefixes: &[String]) -> BTreeMap<String, String>
where
  I: IntoIterator<Item = (K, V)>,
  K: Into<String>,
  V: Into<String>,
{
  vars
    .into_iter()
    .map(|(k, v)| (k.into(), v.into()))
    .filter(|(k, _)| prefixes.iter().any(|p| !p.is_empty() && k.starts_with(p.as_str())))
    .collect()
}

/// JS string literal for `value`. Any `process.env` text inside is written
/// as `process\u002eenv`, so substituted output never matches again.
pub fn js_literal(value: &str) -> String {
  let json = serde_json::Value::String(value.to_string()).to_string();
  json.replace("process.env", "process\\u002eenv")
}

/// Substitute `process.env.NAME` for every exposed `NAME`. Unknown names
/// are left as written.
pub fn replace_env_in_code(code: &str, env: &BTreeMap<String, String>) -> String {
  if env.is_empty() || !code.contains("process.env.") {
    return code.to_string();
  }
  env_ref_re()
    .replace_all(code, |caps: &Captures<'_>| match env.get(&caps[1]) {
      Some(value) => js_literal(value),
      None => caps[0].to_string(),
    })
    .into_owned()
}

/// `export const env = {...}` module for code that reads the whole bag.
pub fn generate_env_module(env: &BTreeMap<String, String>) -> String {
  let mut out = String::from("// Environment variables injected at build time\nexport const env = {\n");
  for (key, value) in env {
    out.push_str(&format!("  {}: {},\n", js_literal(key), js_literal(value)));
  }
  out.push_str("};\n\nif (typeof window !== 'undefined') {\n  window.__BERTUI_ENV__ = env;\n}\n");
  out
}
