//! `kickpass agent [-d] [cmd args...]`: runs the same agent event loop as
//! the standalone `kickpass-agent` binary, so users who never touch the
//! agent directly can still say `kickpass agent` and get caching. Matches
//! `original_source/src/command/agent.c`'s daemonize-then-serve sequence.

use kickpass_core::error::Result;

use kickpass_agent::daemonize;
use kickpass_agent::server::Agent;

pub fn run(no_daemon: bool, command: &[String]) -> Result<()> {
    let notify = if no_daemon {
        None
    } else {
        match daemonize::daemonize()? {
            daemonize::Role::Launcher => return Ok(()),
            daemonize::Role::Daemon(launcher) => Some(launcher),
        }
    };

    let dir = daemonize::socket_dir()?;
    let socket_path = daemonize::socket_path(&dir);
    let mut agent = Agent::bind(&socket_path)?;

    println!("{}={}", kickpass_proto::AGENT_SOCKET_ENV, socket_path.display());
    std::io::Write::flush(&mut std::io::stdout())?;

    if let Some(launcher) = notify {
        daemonize::notify_ready(launcher)?;
        daemonize::redirect_standard_streams()?;
    }

    if !command.is_empty() {
        std::env::set_var(kickpass_proto::AGENT_SOCKET_ENV, &socket_path);
        let child = std::process::Command::new(&command[0]).args(&command[1..]).spawn()?;
        agent.watch_child(nix::unistd::Pid::from_raw(child.id() as i32));
    }

    agent.run()
}
