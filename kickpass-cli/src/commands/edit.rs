//! `kickpass edit [-pmg] [-l N] <name>`: open an existing safe, update its
//! password and/or metadata, then save. Matches `src/command/edit.c`,
//! including the default of editing both fields when neither flag is
//! given and the empty-password confirmation prompt.

use std::io::BufRead;
use std::path::PathBuf;

use kickpass_core::error::{Error, Result};
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::{commands, editor, password};

pub struct EditArgs {
    pub name: String,
    pub password: bool,
    pub metadata: bool,
    pub generate: bool,
    pub length: usize,
}

pub fn run(workspace_root: PathBuf, mut args: EditArgs, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    if !args.password && !args.metadata {
        args.password = true;
        args.metadata = true;
    }

    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(&args.name)?;
    safe.open(&mut ctx, OpenFlags::FORCE)?;

    if args.password {
        if args.generate {
            let generated = password::generate(args.length)?;
            safe.password.as_mut().ok_or(Error::EInternal)?.set(&generated)?;
        } else {
            edit_password(&mut safe, ctx.prompt)?;
        }
    }

    if args.metadata {
        let current = safe.metadata.as_ref().ok_or(Error::EInternal)?.payload().to_vec();
        let edited = editor::edit_metadata(&current)?;
        safe.metadata.as_mut().ok_or(Error::EInternal)?.set(&edited)?;
    }

    safe.save(&mut ctx)?;
    safe.close();
    Ok(())
}

fn edit_password(safe: &mut Safe, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let new_password = prompt.prompt(true, &safe.name)?;

    if new_password.is_empty() && !confirm_empty_password()? {
        return Ok(());
    }

    safe.password.as_mut().ok_or(Error::EInternal)?.set(new_password.as_bytes())
}

fn confirm_empty_password() -> Result<bool> {
    print!("Empty password. Do you really want to update password ? (y/n) [n] ");
    std::io::Write::flush(&mut std::io::stdout())?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_start().starts_with('y'))
}
