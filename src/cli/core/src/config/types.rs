/* src/cli/core/src/config/types.rs */

use std::collections::BTreeMap;

use anyhow::{Result, bail};
use bertui_compiler::DEFAULT_ENV_PREFIXES;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BertuiConfig {
  #[serde(default)]
  pub site: SiteSection,
  #[serde(default)]
  pub meta: MetaSection,
  #[serde(default)]
  pub app_shell: AppShellSection,
  #[serde(default)]
  pub robots: RobotsSection,
  #[serde(default)]
  pub build: BuildSection,
  #[serde(default)]
  pub dev: DevSection,
  #[serde(default)]
  pub serve: ServeSection,
  #[serde(default)]
  pub env: EnvSection,
  #[serde(default)]
  pub middleware: MiddlewareSection,
}

impl BertuiConfig {
  pub fn validate(&self) -> Result<()> {
    if self.dev.port == 0 {
      bail!("dev.port must be non-zero");
    }
    if self.serve.port == 0 {
      bail!("serve.port must be non-zero");
    }
    if let Some(p) = self.env.prefixes.iter().find(|p| p.trim().is_empty()) {
      bail!("env.prefixes must not contain empty strings (got {p:?})");
    }
    for rule in &self.middleware.redirects {
      if !(300..=399).contains(&rule.status) {
        bail!("middleware redirect {} -> {} has non-redirect status {}", rule.from, rule.to, rule.status);
      }
    }
    Ok(())
  }

  /// Display name for banners and the HTML title fallback.
  pub fn project_name(&self) -> &str {
    self.site.name.as_deref().unwrap_or("BertUI App")
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteSection {
  pub name: Option<String>,
  /// Absolute origin used for sitemap entries, e.g. `https://example.com`.
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaSection {
  #[serde(default = "default_title")]
  pub title: String,
  #[serde(default = "default_description")]
  pub description: String,
  pub keywords: Option<String>,
  pub author: Option<String>,
  pub og_image: Option<String>,
  pub theme_color: Option<String>,
  #[serde(default = "default_lang")]
  pub lang: String,
}

impl Default for MetaSection {
  fn default() -> Self {
    Self {
      title: default_title(),
      description: default_description(),
      keywords: None,
      author: None,
      og_image: None,
      theme_color: None,
      lang: default_lang(),
    }
  }
}

fn default_title() -> String {
  "BertUI App".to_string()
}

fn default_description() -> String {
  "Built with BertUI - Lightning fast React development".to_string()
}

fn default_lang() -> String {
  "en".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppShellSection {
  #[serde(default = "default_true")]
  pub loading: bool,
  #[serde(default = "default_loading_text")]
  pub loading_text: String,
  #[serde(default = "default_loading_color")]
  pub background_color: String,
}

impl Default for AppShellSection {
  fn default() -> Self {
    Self {
      loading: true,
      loading_text: default_loading_text(),
      background_color: default_loading_color(),
    }
  }
}

fn default_loading_text() -> String {
  bertui_compiler::loading::DEFAULT_LOADING_TEXT.to_string()
}

fn default_loading_color() -> String {
  bertui_compiler::loading::DEFAULT_LOADING_COLOR.to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RobotsSection {
  #[serde(default)]
  pub disallow: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
  #[serde(default = "default_out_dir")]
  pub out_dir: String,
  #[serde(default = "default_build_dir")]
  pub build_dir: String,
  /// Replaces the built-in `bun build` invocation.
  pub bundler_command: Option<String>,
  /// Replaces the built-in Bun transpiler; reads source on stdin.
  pub transpiler_command: Option<String>,
  #[serde(default = "default_true")]
  pub minify: bool,
  #[serde(default = "default_true")]
  pub sourcemap: bool,
  #[serde(default = "default_externals")]
  pub externals: Vec<String>,
  #[serde(default = "default_true")]
  pub clean_build_dir: bool,
}

impl Default for BuildSection {
  fn default() -> Self {
    Self {
      out_dir: default_out_dir(),
      build_dir: default_build_dir(),
      bundler_command: None,
      transpiler_command: None,
      minify: true,
      sourcemap: true,
      externals: default_externals(),
      clean_build_dir: true,
    }
  }
}

fn default_out_dir() -> String {
  "dist".to_string()
}

fn default_build_dir() -> String {
  ".bertuibuild".to_string()
}

fn default_externals() -> Vec<String> {
  ["react", "react-dom", "react-dom/client"].iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevSection {
  #[serde(default = "default_dev_port")]
  pub port: u16,
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
}

impl Default for DevSection {
  fn default() -> Self {
    Self { port: default_dev_port(), debounce_ms: default_debounce_ms() }
  }
}

fn default_dev_port() -> u16 {
  3000
}

fn default_debounce_ms() -> u64 {
  300
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
  #[serde(default = "default_serve_port")]
  pub port: u16,
  #[serde(default = "default_out_dir")]
  pub dir: String,
}

impl Default for ServeSection {
  fn default() -> Self {
    Self { port: default_serve_port(), dir: default_out_dir() }
  }
}

fn default_serve_port() -> u16 {
  5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvSection {
  #[serde(default = "default_prefixes")]
  pub prefixes: Vec<String>,
}

impl Default for EnvSection {
  fn default() -> Self {
    Self { prefixes: default_prefixes() }
  }
}

fn default_prefixes() -> Vec<String> {
  DEFAULT_ENV_PREFIXES.iter().map(|p| p.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiddlewareSection {
  #[serde(default)]
  pub redirects: Vec<RedirectRule>,
  /// Extra headers added to every page response.
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
  /// Path prefixes answered with 403.
  #[serde(default)]
  pub blocked: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectRule {
  pub from: String,
  pub to: String,
  #[serde(default = "default_redirect_status")]
  pub status: u16,
}

fn default_redirect_status() -> u16 {
  302
}

fn default_true() -> bool {
  true
}
