//! Double-fork daemonization with `SIGCONT` coordination, so the
//! launching process only returns once the agent has actually bound its
//! socket and printed its readiness line, matching
//! `original_source/src/command/agent.c`: the launcher blocks on
//! `sigwait(SIGCONT)`, and the grandchild raises `SIGCONT` against it
//! only after `kp_agent_listen` succeeds and the stdout line is flushed.

use std::path::Path;

use nix::sys::signal::{self, SigHandler, SigSet, Signal};
use nix::unistd::{fork, getpid, setsid, ForkResult, Pid};

use kickpass_core::error::{Error, Result};

/// What a process should do after calling [`daemonize`].
pub enum Role {
    /// This is the original launching process; it has already blocked
    /// until the daemon signaled readiness, so it should simply return.
    Launcher,
    /// This is the grandchild that goes on to run the agent loop. Once
    /// the socket is bound and the readiness line is on stdout, call
    /// [`notify_ready`] with the enclosed pid before redirecting the
    /// standard streams.
    Daemon(Pid),
}

pub fn daemonize() -> Result<Role> {
    unsafe {
        signal::signal(Signal::SIGPIPE, SigHandler::SigIgn).map_err(nix_err)?;
    }

    let launcher = getpid();

    // Block SIGCONT before forking so the launcher can safely sigwait for
    // it below without racing the grandchild's delivery of the signal.
    let mut cont = SigSet::empty();
    cont.add(Signal::SIGCONT);
    cont.thread_block().map_err(nix_err)?;

    match unsafe { fork() }.map_err(nix_err)? {
        ForkResult::Parent { child } => {
            cont.wait().map_err(nix_err)?;
            let _ = nix::sys::wait::waitpid(child, None);
            Ok(Role::Launcher)
        }
        ForkResult::Child => {
            setsid().map_err(nix_err)?;
            match unsafe { fork() }.map_err(nix_err)? {
                ForkResult::Parent { .. } => std::process::exit(0),
                ForkResult::Child => Ok(Role::Daemon(launcher)),
            }
        }
    }
}

/// Tells the launcher it may return now that the socket is bound and the
/// readiness line has been written to stdout.
pub fn notify_ready(launcher: Pid) -> Result<()> {
    signal::kill(launcher, Signal::SIGCONT).map_err(nix_err)
}

/// Redirects stdin/stdout/stderr to `/dev/null`, matching the original's
/// background-process hygiene once the readiness line has been printed
/// and the launcher notified.
pub fn redirect_standard_streams() -> Result<()> {
    use std::fs::OpenOptions;
    use std::os::unix::io::AsRawFd;

    let devnull = OpenOptions::new().read(true).write(true).open("/dev/null")?;
    let fd = devnull.as_raw_fd();
    for target in [0, 1, 2] {
        nix::unistd::dup2(fd, target).map_err(nix_err)?;
    }
    Ok(())
}

pub fn socket_dir() -> Result<std::path::PathBuf> {
    let dir = tempfile::Builder::new()
        .prefix("kickpass-")
        .tempdir()
        .map_err(Error::from)?
        .into_path();
    Ok(dir)
}

pub fn socket_path(dir: &Path) -> std::path::PathBuf {
    dir.join(format!("agent.{}", std::process::id()))
}

fn nix_err(e: nix::Error) -> Error {
    Error::Errno(e as i32)
}
