//! `kickpass copy <name>`: open a safe and copy its password (first line
//! of the safe) to the clipboard. Matches `src/command/copy.c`, routed
//! through the `clipboard` module instead of a hand-rolled X11 selection
//! server.

use std::path::PathBuf;

use kickpass_core::error::Result;
use kickpass_core::{ClipboardWriter, OpenFlags, PasswordPrompt, Safe};

use crate::clipboard::ArboardClipboard;
use crate::commands;

pub fn run(workspace_root: PathBuf, name: &str, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(name)?;
    safe.open(&mut ctx, OpenFlags::empty())?;
    ArboardClipboard.write(safe.password.as_ref().unwrap().payload())?;
    safe.close();
    Ok(())
}
