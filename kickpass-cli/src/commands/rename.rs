//! `kickpass rename <old> <new>`: open the source safe (to confirm the
//! passphrase and, if cached, carry its agent entry across) then rename
//! it on disk. Matches `src/command/rename.c`.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::commands;

pub fn run(workspace_root: PathBuf, old_name: &str, new_name: &str, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(old_name)?;
    safe.open(&mut ctx, OpenFlags::empty())?;
    safe.rename(&mut ctx, new_name)?;
    safe.close();
    Ok(())
}
