use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Resolves the workspace root: `--workspace`/`KICKPASS_WORKSPACE` override,
/// falling back to `$HOME/.kickpass`.
pub fn resolve_root(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = override_path {
        return Ok(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("KICKPASS_WORKSPACE") {
        return Ok(PathBuf::from(p));
    }
    let home = std::env::var_os("HOME").ok_or(Error::NoHome)?;
    Ok(PathBuf::from(home).join(".kickpass"))
}

/// Creates the workspace root directory with mode 0700. Fails with
/// `Error::Errno(EEXIST)` if it already exists.
pub fn init(root: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if root.exists() {
        return Err(Error::Errno(libc::EEXIST));
    }
    fs::create_dir_all(root)?;
    fs::set_permissions(root, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

/// Maps a workspace-relative safe name to its absolute path.
pub fn name_to_path(root: &Path, name: &str) -> Result<PathBuf> {
    let path = root.join(name);
    if path.as_os_str().len() >= libc::PATH_MAX as usize {
        return Err(Error::Errno(libc::ENAMETOOLONG));
    }
    Ok(path)
}

/// `mkdir -p` the parent directories of a safe path, skipping the workspace
/// root itself (mirrors `kp_safe_mkdir`, which never tries to create the
/// workspace root from inside a safe operation).
pub fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Recursively lists every safe under `root`, skipping dotfiles (including
/// `.config`) and non-regular entries. Order is unspecified; callers that
/// need a stable order should sort the result themselves.
pub fn list(root: &Path) -> Result<Vec<String>> {
    let mut acc = Vec::new();
    list_into(root, root, &mut acc)?;
    Ok(acc)
}

fn list_into(root: &Path, dir: &Path, acc: &mut Vec<String>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if file_name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            list_into(root, &path, acc)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|_| Error::EInternal)?
                .to_string_lossy()
                .into_owned();
            acc.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_then_exists_fails() {
        let dir = tempdir().unwrap();
        let ws = dir.path().join("ws");
        init(&ws).unwrap();
        assert_eq!(init(&ws), Err(Error::Errno(libc::EEXIST)));
    }

    #[test]
    fn list_skips_dotfiles_and_recurses() {
        let dir = tempdir().unwrap();
        let ws = dir.path().join("ws");
        init(&ws).unwrap();
        fs::create_dir_all(ws.join("a/b")).unwrap();
        fs::write(ws.join("a/b/c"), b"x").unwrap();
        fs::write(ws.join(".config"), b"x").unwrap();
        fs::write(ws.join("top"), b"x").unwrap();

        let mut names = list(&ws).unwrap();
        names.sort();
        assert_eq!(names, vec!["a/b/c".to_string(), "top".to_string()]);
    }
}
