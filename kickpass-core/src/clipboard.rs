//! The clipboard contract: the core never links against a windowing
//! system directly, so copying a safe's password out to the user's
//! clipboard is pushed behind this trait and supplied by a collaborator.

use crate::error::Result;

pub trait ClipboardWriter {
    fn write(&mut self, text: &[u8]) -> Result<()>;
}

/// A writer that always fails with `EInternal`, for callers that have no
/// clipboard collaborator installed (e.g. headless tests).
pub struct NoClipboard;

impl ClipboardWriter for NoClipboard {
    fn write(&mut self, _text: &[u8]) -> Result<()> {
        Err(crate::error::Error::EInternal)
    }
}
