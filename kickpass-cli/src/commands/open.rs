//! `kickpass open [-t SEC] <name>`: open a safe and push it into the
//! agent's cache with the given timeout, without printing anything.
//! Matches `src/command/open.c`, generalized to go through the same
//! `Safe`/`Context` path every other command uses rather than hand-rolling
//! the `imsg` exchange.

use std::path::PathBuf;

use kickpass_core::error::{Error, Result};
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::commands;

pub fn run(workspace_root: PathBuf, name: &str, timeout: u64, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let mut agent_conn = commands::connect_agent()?;
    if agent_conn.is_none() {
        log::error!("no agent running; nothing to open into, start `kickpass-agent` first");
        return Err(Error::EInput);
    }
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(name)?;
    safe.open(&mut ctx, OpenFlags::FORCE)?;
    safe.store(&mut ctx, timeout)?;
    safe.close();
    Ok(())
}
