/* src/cli/compiler/src/paths.rs */

// Lexical path helpers: no filesystem access, so outputs that do not
// exist yet (the compiled tree) can be addressed.

use std::path::{Component, Path, PathBuf};

/// Source extensions that go through the transformer and come out as `.js`.
pub const COMPILED_EXTENSIONS: &[&str] = &["jsx", "tsx", "ts"];

/// Resolve `.` and `..` segments without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for comp in path.components() {
    match comp {
      Component::CurDir => {}
      Component::ParentDir => {
        let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
        if popped {
          out.pop();
        } else {
          out.push("..");
        }
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Forward-slash path string regardless of platform.
pub fn to_slash(path: &Path) -> String {
  path
    .components()
    .filter_map(|c| match c {
      Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
      Component::ParentDir => Some("..".to_string()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// ES module specifier reaching `target` from a module living in `from_dir`.
/// Always starts with `./` or `../`.
pub fn relative_specifier(from_dir: &Path, target: &Path) -> String {
  let from = normalize(from_dir);
  let to = normalize(target);
  let from_parts: Vec<Component<'_>> = from.components().collect();
  let to_parts: Vec<Component<'_>> = to.components().collect();

  let common = from_parts.iter().zip(to_parts.iter()).take_while(|(a, b)| a == b).count();
  let ups = from_parts.len() - common;

  let mut segments: Vec<String> = Vec::with_capacity(ups + to_parts.len() - common);
  segments.extend(std::iter::repeat_n("..".to_string(), ups));
  for comp in &to_parts[common..] {
    segments.push(comp.as_os_str().to_string_lossy().into_owned());
  }

  let joined = segments.join("/");
  if ups == 0 { format!("./{joined}") } else { joined }
}

/// Where a source file lands in the compiled tree: mirrored under `out_root`,
/// with transformer inputs renamed to `.js`.
pub fn compiled_path(src_root: &Path, out_root: &Path, source: &Path) -> PathBuf {
  let rel = source.strip_prefix(src_root).unwrap_or(source);
  let mut out = out_root.join(rel);
  let compiles =
    out.extension().and_then(|e| e.to_str()).is_some_and(|e| COMPILED_EXTENSIONS.contains(&e));
  if compiles {
    out.set_extension("js");
  }
  out
}

/// Class-map module emitted next to the compiled copy of a `.module.css` file.
pub fn css_module_map_path(src_root: &Path, out_root: &Path, css_source: &Path) -> PathBuf {
  let rel = css_source.strip_prefix(src_root).unwrap_or(css_source);
  let mut name = rel.file_name().map(|n| n.to_os_string()).unwrap_or_default();
  name.push(".js");
  out_root.join(rel).with_file_name(name)
}
