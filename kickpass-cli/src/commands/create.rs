//! `kickpass create -g [-l N] [-o] [-t SEC] <name>`: create a brand-new
//! safe. `-g` generates a random password instead of prompting for one;
//! `-o` additionally opens `$EDITOR` on the metadata (otherwise metadata
//! is left empty, matching `create.c`'s behavior of only invoking the
//! editor on request); `-t` immediately stores the new safe into a
//! running agent with the given timeout.

use std::path::PathBuf;

use kickpass_core::error::{Error, Result};
use kickpass_core::{OpenFlags, PasswordPrompt, Safe};

use crate::{commands, editor, password};

pub struct CreateArgs {
    pub name: String,
    pub generate: bool,
    pub length: usize,
    pub open_editor: bool,
    pub timeout: Option<u64>,
}

pub fn run(workspace_root: PathBuf, args: CreateArgs, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let mut agent_conn = commands::connect_agent()?;
    let mut ctx = commands::build_context(workspace_root, &mut agent_conn, prompt);

    let mut safe = Safe::new(&args.name)?;
    safe.open(&mut ctx, OpenFlags::CREATE).map_err(|e| {
        if e == Error::Errno(libc::EEXIST) {
            log::error!("safe already exists; use `kickpass edit` to modify it");
        }
        e
    })?;

    let password_bytes = if args.generate {
        password::generate(args.length)?
    } else {
        let pw = ctx.prompt.prompt(true, &args.name)?;
        pw.into_bytes()
    };
    safe.password.as_mut().ok_or(Error::EInternal)?.set(&password_bytes)?;

    if args.open_editor {
        let metadata = editor::edit_metadata(b"")?;
        safe.metadata.as_mut().ok_or(Error::EInternal)?.set(&metadata)?;
    }

    safe.save(&mut ctx)?;

    if let Some(timeout) = args.timeout {
        if let Err(e) = safe.store(&mut ctx, timeout) {
            log::debug!("could not cache newly created safe in agent: {}", e);
        }
    }

    safe.close();
    Ok(())
}
