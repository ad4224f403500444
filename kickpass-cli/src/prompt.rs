//! Interactive and askpass-backed implementations of
//! `kickpass_core::PasswordPrompt`, matching the original's `prompt.c`:
//! read from the controlling terminal with echo disabled when one is
//! available, otherwise shell out to an askpass helper.

use std::io::Write;

use kickpass_core::error::{Error, Result};
use kickpass_core::PasswordPrompt;
use nix::sys::termios::{self, LocalFlags, SetArg};

pub struct TtyOrAskpassPrompt {
    askpass: String,
}

impl TtyOrAskpassPrompt {
    pub fn new() -> Self {
        let askpass = std::env::var("KP_ASKPASS").unwrap_or_else(|_| "ssh-askpass".to_string());
        TtyOrAskpassPrompt { askpass }
    }

    fn read_line_echo_off(&self, label: &str) -> Result<String> {
        use std::io::BufRead;

        print!("{}: ", label);
        std::io::stdout().flush()?;

        let stdin_fd = std::io::stdin();
        let fd = std::os::unix::io::AsRawFd::as_raw_fd(&stdin_fd);
        let original = termios::tcgetattr(fd).map_err(nix_err)?;
        let mut quiet = original.clone();
        quiet.local_flags.remove(LocalFlags::ECHO);
        termios::tcsetattr(fd, SetArg::TCSANOW, &quiet).map_err(nix_err)?;

        let mut line = String::new();
        let result = std::io::stdin().lock().read_line(&mut line);

        termios::tcsetattr(fd, SetArg::TCSANOW, &original).map_err(nix_err)?;
        println!();

        result?;
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    fn read_via_askpass(&self, label: &str) -> Result<String> {
        let output = std::process::Command::new(&self.askpass).arg(label).output()?;
        if !output.status.success() {
            return Err(Error::NoPrompt);
        }
        let mut s = String::from_utf8_lossy(&output.stdout).into_owned();
        if s.ends_with('\n') {
            s.pop();
        }
        Ok(s)
    }
}

impl PasswordPrompt for TtyOrAskpassPrompt {
    fn prompt(&mut self, confirm: bool, purpose: &str) -> Result<String> {
        let is_tty = unsafe { libc::isatty(0) } != 0;
        let first = if is_tty {
            self.read_line_echo_off(&format!("Password for {}", purpose))?
        } else {
            self.read_via_askpass(purpose)?
        };

        if confirm {
            let second = if is_tty {
                self.read_line_echo_off(&format!("Confirm password for {}", purpose))?
            } else {
                self.read_via_askpass(purpose)?
            };
            if first != second {
                return Err(Error::EInput);
            }
        }

        Ok(first)
    }
}

fn nix_err(e: nix::Error) -> Error {
    Error::Errno(e as i32)
}
