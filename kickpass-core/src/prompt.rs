//! The password prompt contract: the core calls this whenever it needs
//! the master passphrase and the context's buffer is empty.

use crate::error::{Error, Result};

/// `confirm = true` asks the implementation to read twice and fail on
/// mismatch (used for safe creation); `purpose` is a short human-readable
/// label shown to the user (e.g. the safe name).
pub trait PasswordPrompt {
    fn prompt(&mut self, confirm: bool, purpose: &str) -> Result<String>;
}

/// A prompt backed by a plain closure, for callers that don't need a
/// dedicated type.
pub struct FnPrompt<F>(pub F)
where
    F: FnMut(bool, &str) -> Result<String>;

impl<F> PasswordPrompt for FnPrompt<F>
where
    F: FnMut(bool, &str) -> Result<String>,
{
    fn prompt(&mut self, confirm: bool, purpose: &str) -> Result<String> {
        (self.0)(confirm, purpose)
    }
}

/// A prompt that always fails with `NoPrompt`, used when no interactive
/// collaborator has been installed on the context.
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn prompt(&mut self, _confirm: bool, _purpose: &str) -> Result<String> {
        Err(Error::NoPrompt)
    }
}
