//! `kickpass list [prefix...]`: with no arguments, lists every safe under
//! the workspace; with one or more prefixes, lists only safes whose name
//! starts with one of them. Matches `src/command/list.c`, imposing
//! lexicographic order for determinism since the underlying listing order
//! is unspecified.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::workspace;

pub fn run(workspace_root: PathBuf, prefixes: &[String]) -> Result<()> {
    let mut names = workspace::list(&workspace_root)?;
    names.sort();

    if prefixes.is_empty() {
        for name in &names {
            println!("{}", name);
        }
        return Ok(());
    }

    for prefix in prefixes {
        println!("{}/", prefix);
        for name in names.iter().filter(|n| n.starts_with(prefix.as_str())) {
            let rest = name.strip_prefix(prefix.as_str()).unwrap_or(name).trim_start_matches('/');
            println!("  {}", rest);
        }
    }
    Ok(())
}
