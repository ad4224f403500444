//! Per-subtree configuration, itself stored as a degenerate safe named
//! `.config` whose metadata field carries `key: value` lines.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage;

pub const CONFIG_SAFE_NAME: &str = ".config";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub opslimit: u64,
    pub memlimit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config { opslimit: storage::OPSLIMIT_DEFAULT, memlimit: storage::MEMLIMIT_DEFAULT }
    }
}

impl Config {
    fn serialize(&self) -> String {
        format!("memlimit: {}\nopslimit: {}\n", self.memlimit, self.opslimit)
    }

    /// Parses `key: value` lines, silently ignoring unrecognized keys and
    /// lines with no colon. This tolerance is intentional (see design
    /// notes) and must be preserved.
    fn parse(text: &str) -> Self {
        let mut cfg = Config::default();
        for line in text.lines() {
            let Some((key, value)) = line.split_once(':') else { continue };
            let key = key.trim();
            let value = value.trim();
            match key {
                "memlimit" => {
                    if let Ok(v) = value.parse() {
                        cfg.memlimit = v;
                    }
                }
                "opslimit" => {
                    if let Ok(v) = value.parse() {
                        cfg.opslimit = v;
                    }
                }
                _ => {}
            }
        }
        cfg
    }
}

/// Writes a fresh `.config` safe into `subtree` with no password and the
/// default KDF parameters as metadata.
pub fn create(subtree: &Path, master_password: &[u8], rng: &mut impl rand_core::RngCore) -> Result<()> {
    let cfg = Config::default();
    let path = subtree.join(CONFIG_SAFE_NAME);
    storage::save(&path, master_password, b"", cfg.serialize().as_bytes(), cfg.opslimit, cfg.memlimit, rng)
}

/// Loads the nearest `.config` found by walking from `start` upward.
pub fn load(root: &Path, start: &Path, master_password: &[u8]) -> Result<Config> {
    let subtree = find(root, start)?;
    let path = subtree.join(CONFIG_SAFE_NAME);
    let (_password, metadata) = storage::open(&path, master_password)?;
    let text = String::from_utf8_lossy(&metadata);
    Ok(Config::parse(&text))
}

/// Walks from `start` upward (inclusive), trimming one path segment at a
/// time, and returns the first ancestor that contains a `.config` file.
pub fn find(root: &Path, start: &Path) -> Result<PathBuf> {
    let mut cursor = start.to_path_buf();
    loop {
        if cursor.join(CONFIG_SAFE_NAME).is_file() {
            return Ok(cursor);
        }
        if cursor == root {
            return Err(Error::Errno(libc::ENOENT));
        }
        match cursor.parent() {
            Some(parent) if parent.starts_with(root) || parent == root => {
                cursor = parent.to_path_buf();
            }
            _ => return Err(Error::Errno(libc::ENOENT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ignores_unknown_keys_and_colonless_lines() {
        let cfg = Config::parse("memlimit: 123\nbogus\nopslimit: 456\nunknown: 789\n");
        assert_eq!(cfg.memlimit, 123);
        assert_eq!(cfg.opslimit, 456);
    }

    #[test]
    fn find_walks_up_to_nearest_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        std::fs::write(root.join("a").join(CONFIG_SAFE_NAME), b"").unwrap();

        let found = find(&root, &root.join("a/b")).unwrap();
        assert_eq!(found, root.join("a"));
    }

    #[test]
    fn find_fails_when_no_config_exists() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir_all(root.join("a/b")).unwrap();
        assert_eq!(find(&root, &root.join("a/b")), Err(Error::Errno(libc::ENOENT)));
    }
}
