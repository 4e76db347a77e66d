/* src/cli/core/src/build/bundle.rs */

// Production JS bundling. The bundler itself is external; this module only
// describes the request and reads back what it wrote.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bertui_compiler::CompileError;
use bertui_compiler::env::js_literal;

use super::assets::list_files;
use super::types::OutputFile;
use crate::shell::{run_command, run_program};

#[derive(Debug, Clone)]
pub struct BundleRequest {
  /// Working directory for the bundler (the build dir).
  pub cwd: PathBuf,
  pub entrypoints: Vec<PathBuf>,
  pub out_dir: PathBuf,
  pub externals: Vec<String>,
  /// `process.env.X` -> JS literal
  pub define: BTreeMap<String, String>,
  pub minify: bool,
  pub sourcemap: bool,
}

impl BundleRequest {
  /// Defines for `NODE_ENV=production` plus every exposed env var.
  pub fn production_defines(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut define = BTreeMap::new();
    define.insert("process.env.NODE_ENV".to_string(), js_literal("production"));
    for (k, v) in env {
      define.insert(format!("process.env.{k}"), js_literal(v));
    }
    define
  }
}

#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
  pub files: Vec<OutputFile>,
}

impl BundleOutput {
  /// Hashed entry chunk for `stem`, e.g. `main` -> `main-1a2b3c.js`.
  pub fn entry(&self, stem: &str) -> Option<&OutputFile> {
    let prefix = format!("{stem}-");
    self.files.iter().find(|f| {
      !f.path.contains('/') && f.path.starts_with(&prefix) && f.path.ends_with(".js")
    })
  }

  pub fn total_size(&self) -> u64 {
    self.files.iter().map(|f| f.size).sum()
  }

  /// Everything under `out_dir` except source maps.
  pub fn collect(out_dir: &Path) -> Result<Self, CompileError> {
    let mut files = Vec::new();
    for path in list_files(out_dir).map_err(|e| CompileError::io(out_dir, e))? {
      if path.extension().is_some_and(|e| e == "map") {
        continue;
      }
      let size = std::fs::metadata(&path).map_err(|e| CompileError::io(&path, e))?.len();
      let rel = path.strip_prefix(out_dir).unwrap_or(&path);
      let rel = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
      files.push(OutputFile { path: rel, size });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(Self { files })
  }
}

pub trait Bundler {
  fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, CompileError>;
}

#[derive(Debug, Clone)]
pub enum BundlerMode {
  /// `bun build` with the framework's naming scheme.
  BuiltIn,
  /// User command; request passed through `BERTUI_*` env vars.
  Custom { command: String },
}

#[derive(Debug, Clone)]
pub struct CommandBundler {
  pub mode: BundlerMode,
}

impl CommandBundler {
  pub fn new(custom: Option<&str>) -> Self {
    let mode = match custom {
      Some(command) => BundlerMode::Custom { command: command.to_string() },
      None => BundlerMode::BuiltIn,
    };
    Self { mode }
  }
}

/// Arguments for `bun build`.
pub fn bun_build_args(request: &BundleRequest) -> Vec<String> {
  let mut args = vec!["build".to_string()];
  args.extend(request.entrypoints.iter().map(|p| p.to_string_lossy().into_owned()));
  args.push("--outdir".into());
  args.push(request.out_dir.to_string_lossy().into_owned());
  args.extend(
    [
      "--target=browser",
      "--format=esm",
      "--splitting",
      "--entry-naming=[name]-[hash].js",
      "--chunk-naming=chunks/[name]-[hash].js",
      "--asset-naming=[name]-[hash].[ext]",
    ]
    .map(String::from),
  );
  if request.minify {
    args.push("--minify".into());
  }
  if request.sourcemap {
    args.push("--sourcemap=external".into());
  }
  for ext in &request.externals {
    args.push("--external".into());
    args.push(ext.clone());
  }
  for (k, v) in &request.define {
    args.push("--define".into());
    args.push(format!("{k}={v}"));
  }
  args
}

impl Bundler for CommandBundler {
  fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput, CompileError> {
    std::fs::create_dir_all(&request.out_dir).map_err(|e| CompileError::io(&request.out_dir, e))?;
    let result = match &self.mode {
      BundlerMode::BuiltIn => {
        let args = bun_build_args(request);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_program(&request.cwd, "bun", &args, "bundler")
      }
      BundlerMode::Custom { command } => {
        let entries = request
          .entrypoints
          .iter()
          .map(|p| p.to_string_lossy().into_owned())
          .collect::<Vec<_>>()
          .join(" ");
        let out_dir = request.out_dir.to_string_lossy();
        let externals = request.externals.join(",");
        run_command(
          &request.cwd,
          command,
          "bundler",
          &[
            ("BERTUI_ENTRYPOINTS", &entries),
            ("BERTUI_OUT_DIR", &out_dir),
            ("BERTUI_EXTERNALS", &externals),
            ("NODE_ENV", "production"),
          ],
        )
      }
    };
    result.map_err(|e| CompileError::BundleFailure { message: format!("{e:#}") })?;
    BundleOutput::collect(&request.out_dir)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> BundleRequest {
    let mut env = BTreeMap::new();
    env.insert("PUBLIC_API".to_string(), "https://api.test".to_string());
    BundleRequest {
      cwd: PathBuf::from("/p/.bertuibuild"),
      entrypoints: vec![PathBuf::from("/p/.bertuibuild/main.js"), PathBuf::from("/p/.bertuibuild/router.js")],
      out_dir: PathBuf::from("/p/dist/assets"),
      externals: vec!["react".into(), "react-dom/client".into()],
      define: BundleRequest::production_defines(&env),
      minify: true,
      sourcemap: false,
    }
  }

  #[test]
  fn bun_args_carry_naming_externals_and_defines() {
    let args = bun_build_args(&request());
    assert_eq!(args[0], "build");
    assert_eq!(args[1], "/p/.bertuibuild/main.js");
    assert!(args.contains(&"--entry-naming=[name]-[hash].js".to_string()));
    assert!(args.contains(&"--minify".to_string()));
    assert!(!args.iter().any(|a| a.starts_with("--sourcemap")));
    assert!(args.windows(2).any(|w| w[0] == "--external" && w[1] == "react-dom/client"));
    assert!(args.contains(&"process.env.NODE_ENV=\"production\"".to_string()));
    assert!(args.contains(&"process.env.PUBLIC_API=\"https://api.test\"".to_string()));
  }

  #[test]
  fn collect_finds_hashed_entries() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("chunks")).unwrap();
    std::fs::write(dir.path().join("main-abc123.js"), "m").unwrap();
    std::fs::write(dir.path().join("main-abc123.js.map"), "{}").unwrap();
    std::fs::write(dir.path().join("router-def456.js"), "rr").unwrap();
    std::fs::write(dir.path().join("chunks/main-zzz.js"), "c").unwrap();

    let out = BundleOutput::collect(dir.path()).unwrap();
    assert_eq!(out.files.len(), 3);
    assert_eq!(out.entry("main").unwrap().path, "main-abc123.js");
    assert_eq!(out.entry("router").unwrap().size, 2);
    assert!(out.entry("about").is_none());
    assert_eq!(out.total_size(), 4);
  }

  #[test]
  fn failing_custom_command_is_bundle_failure() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut req = request();
    req.cwd = dir.path().to_path_buf();
    req.out_dir = dir.path().join("assets");
    let bundler = CommandBundler::new(Some("echo 'Could not resolve: ./missing' >&2; exit 1"));
    let err = bundler.bundle(&req).unwrap_err();
    match err {
      CompileError::BundleFailure { message } => assert!(message.contains("Could not resolve")),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn custom_command_sees_request_env() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut req = request();
    req.cwd = dir.path().to_path_buf();
    req.out_dir = dir.path().join("assets");
    let bundler =
      CommandBundler::new(Some("printf '%s' \"$BERTUI_EXTERNALS\" > \"$BERTUI_OUT_DIR/main-1.js\""));
    let out = bundler.bundle(&req).unwrap();
    let main = out.entry("main").unwrap();
    assert_eq!(main.size, "react,react-dom/client".len() as u64);
  }
}
