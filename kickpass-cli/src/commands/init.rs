//! `kickpass init [subpath]`: create the workspace root (or a subtree of
//! it) and seed it with a `.config` safe, prompting for the master
//! passphrase with confirmation. Matches `src/command/init.c`.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::{config, workspace, PasswordPrompt};

pub fn run(workspace_root: PathBuf, subpath: Option<String>, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let subtree = match &subpath {
        Some(sub) => workspace_root.join(sub),
        None => workspace_root.clone(),
    };

    let master_password = prompt.prompt(true, "master")?;

    workspace::init(&subtree)?;
    let mut rng = rand_core::OsRng;
    config::create(&subtree, master_password.as_bytes(), &mut rng)?;

    println!("Workspace initialized at {}", subtree.display());
    Ok(())
}
