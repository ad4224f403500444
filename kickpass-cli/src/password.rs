//! Random password generation for `create -g` / `edit -g`, matching
//! `kp_password_generate` from `original_source/src/command/edit.c`
//! (letters, digits and symbols, no dictionary words).

use kickpass_core::error::{Error, Result};
use passwords::PasswordGenerator;

pub fn generate(length: usize) -> Result<Vec<u8>> {
    let generator = PasswordGenerator {
        length,
        numbers: true,
        lowercase_letters: true,
        uppercase_letters: true,
        symbols: true,
        spaces: false,
        exclude_similar_characters: true,
        strict: true,
    };
    let password = generator.generate_one().map_err(|_| Error::EInternal)?;
    Ok(password.into_bytes())
}
