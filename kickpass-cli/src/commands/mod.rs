//! One module per subcommand, mirroring the original's `src/command/*.c`
//! layout. Each function receives already-parsed arguments and a freshly
//! resolved workspace root, builds its own `kickpass_core::Context`, and
//! returns the library's own error type so `main` can map it to a process
//! exit code.

pub mod agent;
pub mod cat;
pub mod copy;
pub mod create;
pub mod delete;
pub mod edit;
pub mod init;
pub mod list;
pub mod open;
pub mod rename;

use std::path::PathBuf;

use kickpass_agent::client::UnixAgentClient;
use kickpass_core::error::Result;
use kickpass_core::{AgentClient, Context, PasswordPrompt};

/// Connects to the agent named by `KP_AGENT_SOCK`, if any, tolerating its
/// absence entirely (most commands work perfectly well with no agent).
pub fn connect_agent() -> Result<Option<UnixAgentClient>> {
    match UnixAgentClient::connect_from_env() {
        Ok(conn) => Ok(conn),
        Err(e) => {
            log::debug!("agent connection unavailable: {}", e);
            Ok(None)
        }
    }
}

pub fn build_context<'a>(
    workspace_root: PathBuf,
    agent_conn: &'a mut Option<UnixAgentClient>,
    prompt: &'a mut dyn PasswordPrompt,
) -> Context<'a> {
    let agent: Option<&mut dyn AgentClient> = agent_conn.as_mut().map(|a| a as &mut dyn AgentClient);
    Context::new(workspace_root, agent, prompt)
}
