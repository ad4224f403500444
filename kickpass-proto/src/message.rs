use kickpass_core::error::{Error, Result};
use kickpass_core::{METADATA_MAX, PASSWORD_MAX};

use crate::PATH_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType {
    Store = 1,
    Search = 2,
    Discard = 3,
    Error = 4,
}

impl MsgType {
    pub fn from_u8(b: u8) -> Result<Self> {
        match b {
            1 => Ok(MsgType::Store),
            2 => Ok(MsgType::Search),
            3 => Ok(MsgType::Discard),
            4 => Ok(MsgType::Error),
            _ => Err(Error::InvalidMsg),
        }
    }
}

/// A decoded frame: the message type plus its raw payload bytes. Callers
/// decode the payload into the concrete type they expect and treat a size
/// mismatch as `Error::InvalidMsg`.
pub struct Frame {
    pub msg_type: MsgType,
    pub payload: Vec<u8>,
}

/// `timeout < 0` means "cache forever" (used when moving a cached entry
/// during rename); `timeout == 0` is rejected by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRequest {
    pub timeout: i64,
    pub name: String,
    pub password: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl StoreRequest {
    pub const SIZE: usize = 8 + PATH_MAX + PASSWORD_MAX + METADATA_MAX;

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.timeout.to_be_bytes());
        out.extend_from_slice(&pack_fixed(self.name.as_bytes(), PATH_MAX)?);
        out.extend_from_slice(&pack_fixed(&self.password, PASSWORD_MAX)?);
        out.extend_from_slice(&pack_fixed(&self.metadata, METADATA_MAX)?);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidMsg);
        }
        let timeout = i64::from_be_bytes(bytes[0..8].try_into().unwrap());
        let mut cursor = 8;
        let name = unpack_fixed_str(&bytes[cursor..cursor + PATH_MAX])?;
        cursor += PATH_MAX;
        let password = unpack_fixed(&bytes[cursor..cursor + PASSWORD_MAX]);
        cursor += PASSWORD_MAX;
        let metadata = unpack_fixed(&bytes[cursor..cursor + METADATA_MAX]);
        Ok(StoreRequest { timeout, name, password, metadata })
    }
}

/// Request: just the safe name. Reply: the same shape as `StoreRequest`
/// (the `timeout` field is unused on the reply path and sent as zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub name: String,
}

impl SearchRequest {
    pub const SIZE: usize = PATH_MAX;

    pub fn encode(&self) -> Result<Vec<u8>> {
        pack_fixed(self.name.as_bytes(), PATH_MAX)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidMsg);
        }
        Ok(SearchRequest { name: unpack_fixed_str(bytes)? })
    }
}

pub type SearchReply = StoreRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardRequest {
    pub name: String,
}

impl DiscardRequest {
    pub const SIZE: usize = PATH_MAX;

    pub fn encode(&self) -> Result<Vec<u8>> {
        pack_fixed(self.name.as_bytes(), PATH_MAX)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidMsg);
        }
        Ok(DiscardRequest { name: unpack_fixed_str(bytes)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardReply {
    pub ok: bool,
}

impl DiscardReply {
    pub const SIZE: usize = 1;

    pub fn encode(&self) -> Vec<u8> {
        vec![self.ok as u8]
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidMsg);
        }
        Ok(DiscardReply { ok: bytes[0] != 0 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorReply {
    pub err: i32,
    pub err_no: i32,
}

impl ErrorReply {
    pub const SIZE: usize = 8;

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.err.to_be_bytes());
        out.extend_from_slice(&self.err_no.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidMsg);
        }
        Ok(ErrorReply {
            err: i32::from_be_bytes(bytes[0..4].try_into().unwrap()),
            err_no: i32::from_be_bytes(bytes[4..8].try_into().unwrap()),
        })
    }
}

fn pack_fixed(bytes: &[u8], width: usize) -> Result<Vec<u8>> {
    if bytes.len() >= width {
        return Err(Error::EInput);
    }
    let mut out = vec![0u8; width];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

fn unpack_fixed(bytes: &[u8]) -> Vec<u8> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].to_vec()
}

fn unpack_fixed_str(bytes: &[u8]) -> Result<String> {
    String::from_utf8(unpack_fixed(bytes)).map_err(|_| Error::InvalidMsg)
}
