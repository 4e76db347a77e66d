/* src/cli/core/src/build/assets.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// All files under `dir`, recursively, sorted by path. Missing dir -> empty.
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut out = Vec::new();
  if !dir.is_dir() {
    return Ok(out);
  }
  let mut stack = vec![dir.to_path_buf()];
  while let Some(current) = stack.pop() {
    for entry in std::fs::read_dir(&current)? {
      let entry = entry?;
      let path = entry.path();
      if entry.file_type()?.is_dir() {
        stack.push(path);
      } else {
        out.push(path);
      }
    }
  }
  out.sort();
  Ok(out)
}

/// Copy the contents of `from` into `to`, returning the number of files.
pub fn copy_dir(from: &Path, to: &Path) -> Result<usize> {
  let files = list_files(from).with_context(|| format!("failed to read {}", from.display()))?;
  for file in &files {
    let rel = file.strip_prefix(from).unwrap_or(file);
    let target = to.join(rel);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::copy(file, &target)
      .with_context(|| format!("failed to copy {} to {}", file.display(), target.display()))?;
  }
  Ok(files.len())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopiedAssets {
  pub public: usize,
  pub images: usize,
}

/// `public/*` lands at the output root, `src/images/*` under `images/`.
pub fn copy_static_assets(public_dir: &Path, images_dir: &Path, out_dir: &Path) -> Result<CopiedAssets> {
  Ok(CopiedAssets {
    public: copy_dir(public_dir, out_dir)?,
    images: copy_dir(images_dir, &out_dir.join("images"))?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn copies_public_and_images() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("public/fonts")).unwrap();
    std::fs::create_dir_all(root.join("src/images")).unwrap();
    std::fs::write(root.join("public/favicon.ico"), "i").unwrap();
    std::fs::write(root.join("public/fonts/a.woff2"), "f").unwrap();
    std::fs::write(root.join("src/images/logo.png"), "p").unwrap();

    let out = root.join("dist");
    let copied = copy_static_assets(&root.join("public"), &root.join("src/images"), &out).unwrap();
    assert_eq!(copied, CopiedAssets { public: 2, images: 1 });
    assert!(out.join("favicon.ico").is_file());
    assert!(out.join("fonts/a.woff2").is_file());
    assert!(out.join("images/logo.png").is_file());
  }

  #[test]
  fn missing_dirs_copy_nothing() {
    let dir = tempfile::TempDir::new().unwrap();
    let copied =
      copy_static_assets(&dir.path().join("public"), &dir.path().join("img"), &dir.path().join("out"))
        .unwrap();
    assert_eq!(copied, CopiedAssets::default());
  }
}
