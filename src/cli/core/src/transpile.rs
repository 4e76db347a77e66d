/* src/cli/core/src/transpile.rs */

// JSX/TypeScript lowering through an external tool. The built-in path runs
// Bun's transpiler; `build.transpiler_command` swaps in any stdin->stdout tool.

use std::path::PathBuf;

use bertui_compiler::{Dialect, Transpiler};

use crate::shell::{pipe_through, which_exists};

const BUN_SCRIPT: &str = r#"const loader = process.argv[process.argv.length - 1];
const source = await Bun.stdin.text();
const transpiler = new Bun.Transpiler({
  loader,
  target: 'browser',
  tsconfig: { compilerOptions: { jsx: 'react', jsxFactory: 'React.createElement', jsxFragmentFactory: 'React.Fragment' } },
});
process.stdout.write(transpiler.transformSync(source));
"#;

#[derive(Debug, Clone)]
pub enum TranspilerMode {
  Bun,
  /// Shell command; source on stdin, loader in `BERTUI_LOADER`.
  Custom { command: String },
}

#[derive(Debug, Clone)]
pub struct CommandTranspiler {
  base_dir: PathBuf,
  mode: TranspilerMode,
}

impl CommandTranspiler {
  pub fn new(base_dir: impl Into<PathBuf>, custom: Option<&str>) -> Self {
    let mode = match custom {
      Some(command) => TranspilerMode::Custom { command: command.to_string() },
      None => TranspilerMode::Bun,
    };
    Self { base_dir: base_dir.into(), mode }
  }

  /// Fails early when the built-in mode has no `bun` to call.
  pub fn check_available(&self) -> anyhow::Result<()> {
    if matches!(self.mode, TranspilerMode::Bun) && !which_exists("bun") {
      anyhow::bail!("bun not found on PATH -- install Bun or set build.transpiler_command");
    }
    Ok(())
  }
}

impl Transpiler for CommandTranspiler {
  fn lower(&self, source: &str, dialect: Dialect) -> Result<String, String> {
    let loader = dialect.loader();
    match &self.mode {
      TranspilerMode::Bun => {
        pipe_through(&self.base_dir, "bun", &["-e", BUN_SCRIPT, loader], source, &[])
      }
      TranspilerMode::Custom { command } => pipe_through(
        &self.base_dir,
        "sh",
        &["-c", command],
        source,
        &[("BERTUI_LOADER", loader)],
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn custom_command_reads_stdin_and_loader() {
    let dir = tempfile::TempDir::new().unwrap();
    let t = CommandTranspiler::new(dir.path(), Some("printf '%s:' \"$BERTUI_LOADER\"; cat"));
    assert_eq!(t.lower("const a = 1;", Dialect::Tsx).unwrap(), "tsx:const a = 1;");
    assert!(t.check_available().is_ok());
  }

  #[test]
  fn custom_command_failure_is_the_message() {
    let dir = tempfile::TempDir::new().unwrap();
    let t = CommandTranspiler::new(dir.path(), Some("echo 'Unexpected <' >&2; exit 1"));
    assert_eq!(t.lower("<", Dialect::Jsx).unwrap_err(), "Unexpected <");
  }
}
