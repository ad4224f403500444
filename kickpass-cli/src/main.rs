//! `kickpass`: the top-level CLI dispatcher. Parses global options and a
//! subcommand, resolves the workspace root, then hands off to the
//! matching `commands::*` module. Mirrors `original_source/src/main.c`'s
//! `parse_opt`/`command` split, but uses `clap`'s derive dispatcher
//! instead of a hand-rolled `getopt_long` + lookup table.

mod clipboard;
mod commands;
mod editor;
mod password;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kickpass_core::error::{kind_code, Error};
use kickpass_core::workspace;

use prompt::TtyOrAskpassPrompt;

#[derive(Debug, Parser)]
#[clap(name = "kickpass")]
#[clap(about = "A command line password manager", long_about = None)]
struct Cli {
    /// Override the workspace root (defaults to $KICKPASS_WORKSPACE or
    /// $HOME/.kickpass).
    #[clap(long, global = true)]
    workspace: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Initialize a new password safe directory.
    Init {
        /// Optional subdirectory of the workspace to initialize instead of
        /// the root itself.
        subpath: Option<String>,
    },
    /// Create a new password safe.
    #[clap(visible_alias = "new")]
    #[clap(visible_alias = "insert")]
    Create {
        name: String,
        /// Randomly generate the password instead of prompting for it.
        #[clap(short = 'g', long = "generate")]
        generate: bool,
        /// Length of the generated password.
        #[clap(short = 'l', long = "length", default_value_t = 32)]
        length: usize,
        /// Open $EDITOR on the new safe's metadata.
        #[clap(short = 'o', long = "open-editor")]
        open_editor: bool,
        /// Immediately cache the new safe in a running agent for this many
        /// seconds.
        #[clap(short = 't', long = "timeout")]
        timeout: Option<u64>,
    },
    /// Open a safe and load it into the agent's cache.
    Open {
        name: String,
        #[clap(short = 't', long = "timeout", default_value_t = 3600)]
        timeout: u64,
    },
    /// Open a password safe and print its content on stdout.
    #[clap(visible_alias = "show")]
    Cat {
        name: String,
        #[clap(short = 'p', long = "password")]
        password: bool,
        #[clap(short = 'm', long = "metadata")]
        metadata: bool,
    },
    /// Edit a password safe with $EDITOR.
    Edit {
        name: String,
        #[clap(short = 'p', long = "password")]
        password: bool,
        #[clap(short = 'm', long = "metadata")]
        metadata: bool,
        #[clap(short = 'g', long = "generate")]
        generate: bool,
        #[clap(short = 'l', long = "length", default_value_t = 20)]
        length: usize,
    },
    /// Delete a password safe after password confirmation.
    #[clap(visible_alias = "rm")]
    #[clap(visible_alias = "remove")]
    #[clap(visible_alias = "destroy")]
    Delete { name: String },
    /// Rename a password safe.
    #[clap(visible_alias = "mv")]
    #[clap(visible_alias = "move")]
    Rename { old_name: String, new_name: String },
    /// List available safes.
    #[clap(visible_alias = "ls")]
    List { prefix: Vec<String> },
    /// Copy a password (first line of safe) into the clipboard.
    Copy { name: String },
    /// Run the kickpass agent in-process.
    Agent {
        /// Stay attached to the controlling terminal instead of forking
        /// into the background.
        #[clap(short = 'd', long = "no-daemon")]
        no_daemon: bool,
        #[clap(last = true)]
        command: Vec<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(Error::Exit) => std::process::exit(0),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(kind_code(&e));
        }
    }
}

fn run(cli: Cli) -> kickpass_core::error::Result<()> {
    let workspace_root = workspace::resolve_root(cli.workspace.as_deref())?;
    let mut prompt = TtyOrAskpassPrompt::new();

    match cli.command {
        Commands::Init { subpath } => commands::init::run(workspace_root, subpath, &mut prompt),
        Commands::Create { name, generate, length, open_editor, timeout } => {
            let args = commands::create::CreateArgs { name, generate, length, open_editor, timeout };
            commands::create::run(workspace_root, args, &mut prompt)
        }
        Commands::Open { name, timeout } => commands::open::run(workspace_root, &name, timeout, &mut prompt),
        Commands::Cat { name, password, metadata } => {
            commands::cat::run(workspace_root, &name, password, metadata, &mut prompt)
        }
        Commands::Edit { name, password, metadata, generate, length } => {
            let args = commands::edit::EditArgs { name, password, metadata, generate, length };
            commands::edit::run(workspace_root, args, &mut prompt)
        }
        Commands::Delete { name } => commands::delete::run(workspace_root, &name, &mut prompt),
        Commands::Rename { old_name, new_name } => {
            commands::rename::run(workspace_root, &old_name, &new_name, &mut prompt)
        }
        Commands::List { prefix } => commands::list::run(workspace_root, &prefix),
        Commands::Copy { name } => commands::copy::run(workspace_root, &name, &mut prompt),
        Commands::Agent { no_daemon, command } => commands::agent::run(no_daemon, &command),
    }
}
