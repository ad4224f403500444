use std::fmt;

/// Closed set of error kinds the core can surface. Mirrors the numeric
/// `kp_error_t` kinds so they can travel across the agent wire protocol
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Not yet implemented.
    Nyi,
    /// Caller passed malformed input.
    EInput,
    /// An internal invariant was violated.
    EInternal,
    /// A safe file is not a well-formed container.
    InvalidStorage,
    /// `$HOME` is unset or unusable.
    NoHome,
    /// AEAD authentication failed on open.
    EDecrypt,
    /// AEAD seal failed on save.
    EEncrypt,
    /// A wire message had an unexpected shape.
    InvalidMsg,
    /// A passphrase was needed but no prompt is installed.
    NoPrompt,
    /// Benign early exit (e.g. `--help`).
    Exit,
    /// An OS call failed; carries the raw errno.
    Errno(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Nyi => write!(f, "not yet implemented"),
            Error::EInput => write!(f, "invalid input"),
            Error::EInternal => write!(f, "internal error"),
            Error::InvalidStorage => write!(f, "invalid storage"),
            Error::NoHome => write!(f, "cannot find home directory"),
            Error::EDecrypt => write!(f, "cannot decrypt safe"),
            Error::EEncrypt => write!(f, "cannot encrypt safe"),
            Error::InvalidMsg => write!(f, "invalid agent message"),
            Error::NoPrompt => write!(f, "no password prompt available"),
            Error::Exit => write!(f, "exit"),
            Error::Errno(errno) => {
                write!(f, "system error: {}", io_error_from_errno(*errno))
            }
        }
    }
}

impl std::error::Error for Error {}

fn io_error_from_errno(errno: i32) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno)
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.raw_os_error() {
            Some(errno) => Error::Errno(errno),
            None => Error::EInternal,
        }
    }
}

impl From<scrypt::errors::InvalidParams> for Error {
    fn from(_: scrypt::errors::InvalidParams) -> Self {
        Error::Errno(libc::ENOMEM)
    }
}

impl From<scrypt::errors::InvalidOutputLen> for Error {
    fn from(_: scrypt::errors::InvalidOutputLen) -> Self {
        Error::EInternal
    }
}

impl From<chacha20poly1305::Error> for Error {
    fn from(_: chacha20poly1305::Error) -> Self {
        Error::EDecrypt
    }
}

/// Numeric kind used on the wire (`ERROR` frame payload) and as a process
/// exit code. Stable across versions; do not renumber.
pub fn kind_code(e: &Error) -> i32 {
    match e {
        Error::Nyi => 1,
        Error::EInput => 2,
        Error::EInternal => 3,
        Error::InvalidStorage => 4,
        Error::NoHome => 5,
        Error::EDecrypt => 6,
        Error::EEncrypt => 7,
        Error::InvalidMsg => 8,
        Error::NoPrompt => 9,
        Error::Exit => 0,
        Error::Errno(_) => 10,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
