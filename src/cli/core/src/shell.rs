/* src/cli/core/src/shell.rs */

// Shell command helpers shared across build and dev.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result, bail};

use crate::ui::{self, DIM, RESET};

fn failure_message(label: &str, output: &Output) -> String {
  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  let mut msg = format!("{label} exited with status {}", output.status);
  if !stderr.is_empty() {
    msg.push('\n');
    msg.push_str(stderr.trim_end());
  }
  if !stdout.is_empty() {
    msg.push('\n');
    msg.push_str(stdout.trim_end());
  }
  msg
}

/// Run a shell command, bail on failure (shows both stdout and stderr on error).
pub(crate) fn run_command(
  base_dir: &Path,
  command: &str,
  label: &str,
  env: &[(&str, &str)],
) -> Result<()> {
  ui::detail(&format!("{DIM}{command}{RESET}"));
  let mut cmd = Command::new("sh");
  cmd.args(["-c", command]);
  cmd.current_dir(base_dir);
  for (k, v) in env {
    cmd.env(k, v);
  }
  let output = cmd.output().with_context(|| format!("failed to run {label}"))?;
  if !output.status.success() {
    bail!("{}", failure_message(label, &output));
  }
  Ok(())
}

/// Run a program directly, bypassing `sh -c`, for framework-internal tools.
pub(crate) fn run_program(base_dir: &Path, program: &str, args: &[&str], label: &str) -> Result<()> {
  ui::detail(&format!("{DIM}{program} {}{RESET}", args.join(" ")));
  let output = Command::new(program)
    .args(args)
    .current_dir(base_dir)
    .output()
    .with_context(|| format!("failed to run {label}"))?;
  if !output.status.success() {
    bail!("{}", failure_message(label, &output));
  }
  Ok(())
}

/// Run `program args...` with `input` on stdin and return stdout.
/// Non-zero exit yields the stderr text.
pub(crate) fn pipe_through(
  base_dir: &Path,
  program: &str,
  args: &[&str],
  input: &str,
  env: &[(&str, &str)],
) -> std::result::Result<String, String> {
  let mut cmd = Command::new(program);
  cmd.args(args);
  cmd.current_dir(base_dir);
  cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
  for (k, v) in env {
    cmd.env(k, v);
  }
  let mut child = cmd.spawn().map_err(|e| format!("failed to spawn {program}: {e}"))?;
  if let Some(mut stdin) = child.stdin.take() {
    stdin.write_all(input.as_bytes()).map_err(|e| format!("failed to write to {program}: {e}"))?;
  }
  let output = child.wait_with_output().map_err(|e| format!("failed to wait for {program}: {e}"))?;
  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    return Err(if stderr.is_empty() { failure_message(program, &output) } else { stderr });
  }
  String::from_utf8(output.stdout).map_err(|e| format!("{program} wrote invalid UTF-8: {e}"))
}

/// Check if a command exists on PATH.
pub(crate) fn which_exists(cmd: &str) -> bool {
  Command::new("which")
    .arg(cmd)
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .map(|s| s.success())
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pipe_through_returns_stdout() {
    let dir = tempfile::TempDir::new().unwrap();
    let out = pipe_through(dir.path(), "cat", &[], "hello", &[]).unwrap();
    assert_eq!(out, "hello");
  }

  #[test]
  fn pipe_through_reports_stderr() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = pipe_through(dir.path(), "sh", &["-c", "echo boom >&2; exit 3"], "", &[]).unwrap_err();
    assert_eq!(err, "boom");
  }

  #[test]
  fn run_command_bails_with_output() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = run_command(dir.path(), "echo nope; exit 1", "probe", &[]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("probe exited with status"));
    assert!(msg.contains("nope"));
  }
}
