/* src/cli/compiler/src/transform.rs */

// Per-file source rewrite pipeline. Each pass is a plain `&str -> String`
// function so it can be replaced on its own; `transform_source` applies
// them in the required order around the external lowering step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::CompileError;
use crate::paths::{compiled_path, css_module_map_path, normalize, relative_specifier};
use crate::{ROUTER_MODULE, ROUTER_SPECIFIER, STYLES_SPECIFIER};

/// Source dialect handed to the lowering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
  Jsx,
  Tsx,
  Ts,
}

impl Dialect {
  /// `.tsx` -> Tsx, `.ts` -> Ts, anything else Jsx.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some("tsx") => Self::Tsx,
      Some("ts") => Self::Ts,
      _ => Self::Jsx,
    }
  }

  pub fn loader(self) -> &'static str {
    match self {
      Self::Jsx => "jsx",
      Self::Tsx => "tsx",
      Self::Ts => "ts",
    }
  }
}

/// JSX/TS lowering collaborator. JSX must be lowered with the
/// `React.createElement` / `React.Fragment` factories.
pub trait Transpiler: Send + Sync {
  /// Returns the lowered module or the transpiler's diagnostic text.
  fn lower(&self, source: &str, dialect: Dialect) -> Result<String, String>;
}

/// Shared inputs for every file in one compile pass.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
  /// Project `src/` directory.
  pub src_root: &'a Path,
  /// Root of the compiled mirror tree (where `router.js` lives).
  pub out_root: &'a Path,
  pub env: &'a BTreeMap<String, String>,
}

impl TransformContext<'_> {
  fn compiled_dir(&self, file: &Path) -> PathBuf {
    let out = compiled_path(self.src_root, self.out_root, file);
    out.parent().map(Path::to_path_buf).unwrap_or_else(|| self.out_root.to_path_buf())
  }
}

fn css_module_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r#"import\s+([A-Za-z_$][\w$]*)\s+from\s+['"]([^'"]+\.module\.css)['"]"#).unwrap()
  })
}

fn style_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r#"(?m)^[ \t]*import\s+(?:[A-Za-z_$][\w$]*\s+from\s+)?['"][^'"\n]+\.(?:css|scss|sass)['"][ \t]*;?[ \t]*\r?\n?"#,
    )
    .unwrap()
  })
}

fn framework_styles_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    let spec = regex::escape(STYLES_SPECIFIER);
    Regex::new(&format!(r#"(?m)^[ \t]*import\s+['"]{spec}['"][ \t]*;?[ \t]*\r?\n?"#)).unwrap()
  })
}

fn router_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    let spec = regex::escape(ROUTER_SPECIFIER);
    Regex::new(&format!(r#"from\s+['"]{spec}['"]"#)).unwrap()
  })
}

fn react_import_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"import\s+(?:\*\s+as\s+)?React\b").unwrap())
}

fn relative_specifier_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r#"(\bfrom\s+|\bimport\s*\(\s*|\bimport\s+)(['"])(\.\.?/[^'"\n]*)(['"])"#).unwrap()
  })
}

/// Specifier extensions left alone by pass 7. Anything else after the last
/// dot (`./api.client`, `./Button.styles`) is part of the module name.
const KNOWN_EXTENSIONS: &[&str] = &[
  "js", "mjs", "cjs", "jsx", "ts", "tsx", "json", "css", "svg", "png", "jpg", "jpeg", "gif",
  "webp", "avif", "ico",
];

fn has_known_extension(name: &str) -> bool {
  name.rsplit_once('.').is_some_and(|(stem, ext)| !stem.is_empty() && KNOWN_EXTENSIONS.contains(&ext))
}

/// Pass 1: point `*.module.css` imports at the emitted class-map module,
/// relative to where this file will live in the compiled tree.
pub fn rewrite_css_module_imports(code: &str, file: &Path, ctx: &TransformContext<'_>) -> String {
  let source_dir = file.parent().unwrap_or(ctx.src_root);
  let compiled_dir = ctx.compiled_dir(file);
  css_module_import_re()
    .replace_all(code, |caps: &Captures<'_>| {
      let specifier = &caps[2];
      if !specifier.starts_with('.') {
        return caps[0].to_string();
      }
      let css_source = normalize(&source_dir.join(specifier));
      let map_module = css_module_map_path(ctx.src_root, ctx.out_root, &css_source);
      format!("import {} from '{}'", &caps[1], relative_specifier(&compiled_dir, &map_module))
    })
    .into_owned()
}

/// Pass 2: drop plain stylesheet imports and the framework styles import.
pub fn strip_style_imports(code: &str) -> String {
  let code = style_import_re().replace_all(code, "");
  framework_styles_re().replace_all(&code, "").into_owned()
}

/// Pass 4: resolve the router specifier to the generated module.
pub fn rewrite_router_import(code: &str, file: &Path, ctx: &TransformContext<'_>) -> String {
  if !code.contains(ROUTER_SPECIFIER) {
    return code.to_string();
  }
  let target = ctx.out_root.join(ROUTER_MODULE);
  let specifier = relative_specifier(&ctx.compiled_dir(file), &target);
  router_import_re().replace_all(code, format!("from '{specifier}'").as_str()).into_owned()
}

/// Pass 6: prepend the React import when lowered JSX needs it.
pub fn inject_react_import(code: &str) -> String {
  let uses_react = code.contains("React.createElement") || code.contains("React.Fragment");
  if uses_react && !react_import_re().is_match(code) {
    format!("import React from 'react';\n{code}")
  } else {
    code.to_string()
  }
}

/// Pass 7: append `.js` to extension-less relative specifiers.
pub fn add_js_extensions(code: &str) -> String {
  relative_specifier_re()
    .replace_all(code, |caps: &Captures<'_>| {
      let path = &caps[3];
      let last = path.rsplit('/').next().unwrap_or(path);
      if path.ends_with('/') || has_known_extension(last) {
        caps[0].to_string()
      } else {
        format!("{}{}{path}.js{}", &caps[1], &caps[2], &caps[4])
      }
    })
    .into_owned()
}

/// Full pipeline for one module. `file` is the absolute source path.
pub fn transform_source(
  source: &str,
  file: &Path,
  ctx: &TransformContext<'_>,
  transpiler: &dyn Transpiler,
) -> Result<String, CompileError> {
  let code = rewrite_css_module_imports(source, file, ctx);
  let code = strip_style_imports(&code);
  let code = crate::env::replace_env_in_code(&code, ctx.env);
  let code = rewrite_router_import(&code, file, ctx);
  let lowered = transpiler
    .lower(&code, Dialect::from_path(file))
    .map_err(|message| CompileError::compile(file, message))?;
  let code = inject_react_import(&lowered);
  Ok(add_js_extensions(&code))
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Lowering stand-in: turns `<X />` into a createElement call and
  /// rejects sources containing `@@syntax`.
  struct FakeTranspiler;

  impl Transpiler for FakeTranspiler {
    fn lower(&self, source: &str, _dialect: Dialect) -> Result<String, String> {
      if source.contains("@@syntax") {
        return Err("Unexpected token".into());
      }
      Ok(source.replace("<X />", "React.createElement(X, null)"))
    }
  }

  fn ctx<'a>(env: &'a BTreeMap<String, String>) -> TransformContext<'a> {
    TransformContext { src_root: Path::new("/p/src"), out_root: Path::new("/p/out"), env }
  }

  #[test]
  fn dialect_from_extension() {
    assert_eq!(Dialect::from_path(Path::new("a.tsx")), Dialect::Tsx);
    assert_eq!(Dialect::from_path(Path::new("a.ts")), Dialect::Ts);
    assert_eq!(Dialect::from_path(Path::new("a.jsx")), Dialect::Jsx);
    assert_eq!(Dialect::Tsx.loader(), "tsx");
  }

  #[test]
  fn css_module_import_points_at_class_map() {
    let env = BTreeMap::new();
    let code = "import styles from '../components/card.module.css';";
    let out = rewrite_css_module_imports(code, Path::new("/p/src/pages/index.jsx"), &ctx(&env));
    assert_eq!(out, "import styles from '../components/card.module.css.js';");
  }

  #[test]
  fn bare_css_module_specifier_untouched() {
    let env = BTreeMap::new();
    let code = "import s from 'pkg/x.module.css'";
    let out = rewrite_css_module_imports(code, Path::new("/p/src/a.jsx"), &ctx(&env));
    assert_eq!(out, code);
  }

  #[test]
  fn style_imports_are_stripped() {
    let code = "import './a.css';\nimport theme from \"../t.scss\"\nimport 'bertui/styles';\nconst x = 1;\n";
    assert_eq!(strip_style_imports(code), "const x = 1;\n");
  }

  #[test]
  fn rewritten_module_imports_survive_stripping() {
    let code = "import styles from './card.module.css.js';\n";
    assert_eq!(strip_style_imports(code), code);
  }

  #[test]
  fn router_import_is_relative_to_compiled_location() {
    let env = BTreeMap::new();
    let code = "import { Link } from 'bertui/router';";
    let out = rewrite_router_import(code, Path::new("/p/src/pages/blog/[slug].tsx"), &ctx(&env));
    assert_eq!(out, "import { Link } from '../../router.js';");
  }

  #[test]
  fn react_import_injected_once() {
    let code = "export default () => React.createElement('div', null);";
    let once = inject_react_import(code);
    assert!(once.starts_with("import React from 'react';\n"));
    assert_eq!(inject_react_import(&once), once);
  }

  #[test]
  fn react_import_not_needed_without_jsx() {
    assert_eq!(inject_react_import("export const a = 1;"), "export const a = 1;");
  }

  #[test]
  fn namespace_react_import_counts() {
    let code = "import * as React from 'react';\nReact.createElement('p');";
    assert_eq!(inject_react_import(code), code);
  }

  #[test]
  fn js_extension_added_only_where_missing() {
    let code = concat!(
      "import A from './a';\n",
      "import B from '../b.js';\n",
      "import C from './dir/';\n",
      "import D from 'react';\n",
      "import './side';\n",
      "const E = import('./lazy');\n",
    );
    let out = add_js_extensions(code);
    assert!(out.contains("from './a.js'"));
    assert!(out.contains("from '../b.js'"));
    assert!(out.contains("from './dir/'"));
    assert!(out.contains("from 'react'"));
    assert!(out.contains("import './side.js'"));
    assert!(out.contains("import('./lazy.js')"));
  }

  #[test]
  fn dotted_module_names_still_get_js() {
    let code = concat!(
      "import api from './api.client';\n",
      "import styles from './Button.styles';\n",
      "import data from './data.json';\n",
      "import logo from '../images/logo.svg';\n",
      "import Card from './Card.jsx';\n",
    );
    let out = add_js_extensions(code);
    assert!(out.contains("from './api.client.js'"));
    assert!(out.contains("from './Button.styles.js'"));
    assert!(out.contains("from './data.json'"));
    assert!(out.contains("from '../images/logo.svg'"));
    assert!(out.contains("from './Card.jsx'"));
  }

  #[test]
  fn full_pipeline_applies_passes_in_order() {
    let mut env = BTreeMap::new();
    env.insert("PUBLIC_TITLE".to_string(), "Hello".to_string());
    let source = concat!(
      "import './page.css';\n",
      "import styles from './card.module.css';\n",
      "import { Link } from 'bertui/router';\n",
      "import X from './x';\n",
      "const t = process.env.PUBLIC_TITLE;\n",
      "export default () => <X />;\n",
    );
    let out =
      transform_source(source, Path::new("/p/src/pages/index.jsx"), &ctx(&env), &FakeTranspiler)
        .unwrap();
    assert!(out.starts_with("import React from 'react';\n"));
    assert!(!out.contains("page.css"));
    assert!(out.contains("from './card.module.css.js'"));
    assert!(out.contains("from '../router.js'"));
    assert!(out.contains("from './x.js'"));
    assert!(out.contains("const t = \"Hello\";"));
    assert!(out.contains("React.createElement(X, null)"));
  }

  #[test]
  fn lowering_failure_is_compile_error() {
    let env = BTreeMap::new();
    let err = transform_source("@@syntax", Path::new("/p/src/a.jsx"), &ctx(&env), &FakeTranspiler)
      .unwrap_err();
    match err {
      CompileError::Compile { file, message } => {
        assert_eq!(file, PathBuf::from("/p/src/a.jsx"));
        assert_eq!(message, "Unexpected token");
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
