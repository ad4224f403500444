//! `kickpass cat -p -m <name>`: open a safe and print its password and/or
//! metadata to stdout; with neither flag, print both, password first.
//! Matches `src/command/cat.c`.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::commands;

pub fn run(
    workspace_root: PathBuf,
    name: &str,
    mut password: bool,
    mut metadata: bool,
    prompt: &mut dyn PasswordPrompt,
) -> Result<()> {
    if !password && !metadata {
        password = true;
        metadata = true;
    }

    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(name)?;
    safe.open(&mut ctx, OpenFlags::empty())?;

    if password {
        println!("{}", String::from_utf8_lossy(safe.password.as_ref().unwrap().payload()));
    }
    if metadata {
        println!("{}", String::from_utf8_lossy(safe.metadata.as_ref().unwrap().payload()));
    }

    safe.close();
    Ok(())
}
