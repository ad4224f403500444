//! `kickpass delete <name>`: open a safe for password confirmation, then
//! remove its cipher file and discard any cached agent entry. Matches
//! `src/command/delete.c`'s default (non-`-f`) path; SPEC_FULL drops the
//! force-without-confirmation variant from the CLI surface.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::commands;

pub fn run(workspace_root: PathBuf, name: &str, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(name)?;
    safe.open(&mut ctx, OpenFlags::FORCE)?;
    safe.delete(&mut ctx)?;
    safe.close();
    Ok(())
}
