//! Copies a safe's password into the system clipboard, matching the
//! original's `src/command/copy.c`: open an X11 selection, serve it once,
//! then exit. `arboard` is the idiomatic Rust stand-in for the hand-rolled
//! `XSetSelectionOwner`/`XNextEvent` loop the original runs, wired in
//! behind `kickpass_core::ClipboardWriter` so the core crate itself never
//! links against a windowing system.

use kickpass_core::error::{Error, Result};
use kickpass_core::ClipboardWriter;

pub struct ArboardClipboard;

impl ClipboardWriter for ArboardClipboard {
    fn write(&mut self, text: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(text).into_owned();
        let mut clipboard = arboard::Clipboard::new().map_err(|_| Error::EInternal)?;
        clipboard.set_text(text).map_err(|_| Error::EInternal)?;
        Ok(())
    }
}
