use anyhow::Result;
use clap::Parser;

use kickpass_agent::daemonize;
use kickpass_agent::server::Agent;

#[derive(Debug, Parser)]
#[clap(name = "kickpass-agent")]
#[clap(about = "Caches decrypted kickpass safes for a bounded time.", long_about = None)]
struct Cli {
    /// Stay attached to the controlling terminal instead of forking into
    /// the background.
    #[clap(short = 'd', long = "no-daemon")]
    no_daemon: bool,

    /// Optional subcommand to run with KP_AGENT_SOCK set in its
    /// environment; the agent exits once it does.
    #[clap(last = true)]
    command: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let notify = if cli.no_daemon {
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

    if !cli.command.is_empty() {
        std::env::set_var(kickpass_proto::AGENT_SOCKET_ENV, &socket_path);
        let child = std::process::Command::new(&cli.command[0]).args(&cli.command[1..]).spawn()?;
        agent.watch_child(nix::unistd::Pid::from_raw(child.id() as i32));
    }

    agent.run()?;
    Ok(())
}
