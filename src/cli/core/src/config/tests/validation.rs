/* src/cli/core/src/config/tests/validation.rs */

use crate::config::*;

#[test]
fn zero_port_is_rejected() {
  let err = parse_bertui_config("[dev]\nport = 0\n").unwrap_err();
  assert!(err.to_string().contains("dev.port"));
  let err = parse_bertui_config("[serve]\nport = 0\n").unwrap_err();
  assert!(err.to_string().contains("serve.port"));
}

#[test]
fn empty_env_prefix_is_rejected() {
  let err = parse_bertui_config("[env]\nprefixes = [\"PUBLIC_\", \"\"]\n").unwrap_err();
  assert!(err.to_string().contains("env.prefixes"));
}

#[test]
fn redirect_status_must_be_3xx() {
  let toml_str = "[[middleware.redirects]]\nfrom = \"/a\"\nto = \"/b\"\nstatus = 200\n";
  let err = parse_bertui_config(toml_str).unwrap_err();
  assert!(err.to_string().contains("non-redirect status 200"));
}

#[test]
fn malformed_toml_is_an_error() {
  assert!(parse_bertui_config("[dev\nport = 1").is_err());
  assert!(parse_bertui_config("[dev]\nport = \"fast\"\n").is_err());
}

#[test]
fn load_reports_path_on_failure() {
  let dir = tempfile::TempDir::new().unwrap();
  let path = dir.path().join(CONFIG_FILE);
  std::fs::write(&path, "[dev]\nport = 0\n").unwrap();
  let err = load_bertui_config(&path).unwrap_err();
  assert!(format!("{err:#}").contains("bertui.toml"));
}
