//! The safe container format: header packing, key derivation and the
//! AEAD encrypt/decrypt pipeline guarding a safe's plaintext.

use std::io::{Read, Seek, SeekFrom, Write};

use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::{AeadInPlace, ChaCha20Poly1305, KeyInit};
use rand_core::RngCore;

use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 60;
pub const SALT_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 8;
pub const ABYTES: usize = 16;

pub const STORAGE_VERSION: u16 = 0x0001;
/// Identifies the KDF/AEAD build in use; bumped whenever the underlying
/// crate choice changes in a way that affects on-disk compatibility.
pub const SODIUM_VERSION: u16 = 0x0100;

/// Default scrypt `opslimit`, a fifth of the "sensitive" profile.
pub const OPSLIMIT_DEFAULT: u64 = 33_554_432 / 5;
/// Default scrypt `memlimit` in bytes, a fifth of the "sensitive" profile.
pub const MEMLIMIT_DEFAULT: u64 = 1_073_741_824 / 5;

/// The fixed 60-byte header prepended to every safe file, included as AEAD
/// associated data so tampering with any field invalidates the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u16,
    pub sodium_version: u16,
    pub opslimit: u64,
    pub memlimit: u64,
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
}

impl Header {
    pub fn fresh(opslimit: u64, memlimit: u64, rng: &mut impl RngCore) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);
        Header { version: STORAGE_VERSION, sodium_version: SODIUM_VERSION, opslimit, memlimit, salt, nonce }
    }

    pub fn pack(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..2].copy_from_slice(&self.version.to_be_bytes());
        out[2..4].copy_from_slice(&self.sodium_version.to_be_bytes());
        out[4..12].copy_from_slice(&self.opslimit.to_be_bytes());
        out[12..20].copy_from_slice(&self.memlimit.to_be_bytes());
        out[20..52].copy_from_slice(&self.salt);
        out[52..60].copy_from_slice(&self.nonce);
        out
    }

    pub fn unpack(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        salt.copy_from_slice(&bytes[20..52]);
        nonce.copy_from_slice(&bytes[52..60]);
        Header {
            version: u16::from_be_bytes([bytes[0], bytes[1]]),
            sodium_version: u16::from_be_bytes([bytes[2], bytes[3]]),
            opslimit: u64::from_be_bytes(bytes[4..12].try_into().unwrap()),
            memlimit: u64::from_be_bytes(bytes[12..20].try_into().unwrap()),
            salt,
            nonce,
        }
    }
}

/// Translates the header's `(opslimit, memlimit)` pair into concrete scrypt
/// work-factor parameters, following the shape of libsodium's
/// `pickparams` (fixed `r = 8`, `N` and `p` chosen from the ops/mem
/// budget). This repository does not need byte-identical parameter
/// selection to libsodium, only a deterministic, monotonic mapping from
/// the same two knobs the header already carries.
fn pick_params(opslimit: u64, memlimit: u64) -> Result<scrypt::Params> {
    let opslimit = opslimit.max(32_768);
    let r: u32 = 8;

    let max_n = if opslimit < memlimit / 32 {
        opslimit / (r as u64 * 4)
    } else {
        memlimit / (r as u64 * 128)
    };

    let mut log_n: u8 = 1;
    while log_n < 20 && (1u64 << (log_n + 1)) <= (max_n / 2).max(2) {
        log_n += 1;
    }

    let p: u32 = 1;
    scrypt::Params::new(log_n, r, p, 32).map_err(Error::from)
}

fn derive_key(password: &[u8], header: &Header) -> Result<[u8; 32]> {
    let params = pick_params(header.opslimit, header.memlimit)?;
    let mut key = [0u8; 32];
    scrypt::scrypt(password, &header.salt, &params, &mut key).map_err(Error::from)?;
    Ok(key)
}

/// Saves `(password, metadata)` into the file at `path`, always rewriting
/// it from offset 0 with a freshly generated salt and nonce.
pub fn save(
    path: &std::path::Path,
    master_password: &[u8],
    password: &[u8],
    metadata: &[u8],
    opslimit: u64,
    memlimit: u64,
    rng: &mut impl RngCore,
) -> Result<()> {
    let mut plaintext = Vec::with_capacity(password.len() + metadata.len() + 2);
    plaintext.extend_from_slice(password);
    plaintext.push(0);
    plaintext.extend_from_slice(metadata);
    plaintext.push(0);

    let header = Header::fresh(opslimit, memlimit, rng);
    let header_bytes = header.pack();

    let key = derive_key(master_password, &header)?;
    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(&key));
    let nonce = expand_nonce(&header.nonce);

    let mut buffer = plaintext;
    cipher
        .encrypt_in_place(GenericArray::from_slice(&nonce), &header_bytes, &mut buffer)
        .map_err(|_| Error::EEncrypt)?;

    let mut file = std::fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    file.write_all(&header_bytes)?;
    file.write_all(&buffer)?;
    Ok(())
}

/// Opens the file at `path`, returning `(password, metadata)` on success.
pub fn open(path: &std::path::Path, master_password: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut file = std::fs::File::open(path)?;

    let mut header_bytes = [0u8; HEADER_SIZE];
    match file.read_exact(&mut header_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(Error::InvalidStorage),
        Err(e) => return Err(e.into()),
    }
    let header = Header::unpack(&header_bytes);

    let mut ciphertext = Vec::new();
    let plain_max = crate::buffer::PASSWORD_MAX + crate::buffer::METADATA_MAX;
    let limit = (plain_max + ABYTES) as u64;
    let pos = file.seek(SeekFrom::Current(0))?;
    let remaining = file.metadata()?.len().saturating_sub(pos);
    if remaining > limit {
        return Err(Error::Errno(libc::ENOMEM));
    }
    file.read_to_end(&mut ciphertext)?;
    if ciphertext.len() <= ABYTES {
        return Err(Error::InvalidStorage);
    }

    let key = derive_key(master_password, &header)?;
    let cipher = ChaCha20Poly1305::new(GenericArray::from_slice(&key));
    let nonce = expand_nonce(&header.nonce);

    cipher
        .decrypt_in_place(GenericArray::from_slice(&nonce), &header_bytes, &mut ciphertext)
        .map_err(|_| Error::EDecrypt)?;

    let first_nul = ciphertext.iter().position(|&b| b == 0).ok_or(Error::InvalidStorage)?;
    let password = ciphertext[..first_nul].to_vec();
    let rest = &ciphertext[first_nul + 1..];
    let second_nul = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    let metadata = rest[..second_nul].to_vec();

    Ok((password, metadata))
}

/// chacha20poly1305 requires a 12-byte nonce; the on-disk format only
/// carries 8 bytes, so the remaining 4 bytes are fixed at zero. This is
/// safe because each safe's nonce is freshly randomized per save alongside
/// an independent salt. Note this is the IETF (96-bit nonce) construction,
/// not libsodium's original 64-bit-nonce `crypto_aead_chacha20poly1305`;
/// the two are not byte-compatible for the same key/nonce/AAD (known
/// deviation, see spec S3/S4).
fn expand_nonce(short: &[u8; NONCE_SIZE]) -> [u8; 12] {
    let mut full = [0u8; 12];
    full[..NONCE_SIZE].copy_from_slice(short);
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn header_round_trip() {
        let h = Header {
            version: 0xdead,
            sodium_version: 0xbaad,
            opslimit: 0x71f9_7b79_931b_97d8,
            memlimit: 0x50b7_7cc3_5484_6208,
            salt: [
                0x12, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80, 0x90, 0xa0, 0xb0, 0xc0, 0xd0, 0xe0,
                0xf0, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
                0x0f, 0x2c,
            ],
            nonce: [0xe6, 0x59, 0x12, 0x7a, 0xf5, 0x7d, 0xfc, 0xf8],
        };
        let packed = h.pack();
        assert_eq!(packed.len(), HEADER_SIZE);
        assert_eq!(&packed[0..4], &[0xde, 0xad, 0xba, 0xad]);
        assert_eq!(Header::unpack(&packed), h);
    }

    #[test]
    fn save_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safe");
        let mut rng = OsRng;
        save(&path, b"master", b"p4ssw0rd", b"url: example.com\n", 32_768, 1 << 20, &mut rng).unwrap();

        let (password, metadata) = open(&path, b"master").unwrap();
        assert_eq!(password, b"p4ssw0rd");
        assert_eq!(metadata, b"url: example.com\n");
    }

    #[test]
    fn wrong_passphrase_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safe");
        let mut rng = OsRng;
        save(&path, b"master", b"p4ssw0rd", b"", 32_768, 1 << 20, &mut rng).unwrap();
        assert_eq!(open(&path, b"not-master"), Err(Error::EDecrypt));
    }

    #[test]
    fn tampered_ciphertext_fails_to_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safe");
        let mut rng = OsRng;
        save(&path, b"master", b"p4ssw0rd", b"meta", 32_768, 1 << 20, &mut rng).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        std::fs::write(&path, &bytes).unwrap();

        assert_eq!(open(&path, b"master"), Err(Error::EDecrypt));
    }

    #[test]
    fn truncated_file_is_invalid_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safe");
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert_eq!(open(&path, b"master"), Err(Error::InvalidStorage));
    }
}
