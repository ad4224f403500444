//! Invokes `$EDITOR` on a safe's metadata, matching `original_source`'s
//! `src/editor.c`: write to a private temp file, run the editor
//! synchronously, read the result back, then remove the temp file
//! regardless of outcome.

use kickpass_core::error::Result;

pub fn edit_metadata(initial: &[u8]) -> Result<Vec<u8>> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    let mut tmp = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(&mut tmp, initial)?;
    tmp.flush()?;

    let status = std::process::Command::new(&editor).arg(tmp.path()).status()?;
    if !status.success() {
        return Err(kickpass_core::error::Error::EInput);
    }

    let edited = std::fs::read(tmp.path())?;
    Ok(edited)
}
