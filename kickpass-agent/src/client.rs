//! The agent client: connects to the socket named by `KP_AGENT_SOCK` and
//! funnels `Store`/`Search`/`Discard` requests through the framed codec.

use std::os::unix::net::UnixStream;
use std::path::Path;

use kickpass_core::error::{Error, Result};
use kickpass_core::{AgentClient, CachedSafe};
use kickpass_proto::message::{DiscardReply, DiscardRequest, ErrorReply, SearchReply, SearchRequest, StoreRequest};
use kickpass_proto::{read_frame, write_frame, MsgType};

pub struct UnixAgentClient {
    stream: UnixStream,
}

impl UnixAgentClient {
    pub fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path)?;
        Ok(UnixAgentClient { stream })
    }

    /// Connects using the path in `KP_AGENT_SOCK`, returning `None` if the
    /// variable is unset (no agent configured for this session).
    pub fn connect_from_env() -> Result<Option<Self>> {
        match std::env::var_os(kickpass_proto::AGENT_SOCKET_ENV) {
            Some(path) => Self::connect(Path::new(&path)).map(Some),
            None => Ok(None),
        }
    }

    fn round_trip(&mut self, msg_type: MsgType, payload: &[u8]) -> Result<(MsgType, Vec<u8>)> {
        write_frame(&mut self.stream, msg_type, payload)?;
        let frame = read_frame(&mut self.stream)?;
        Ok((frame.msg_type, frame.payload))
    }
}

impl AgentClient for UnixAgentClient {
    fn search(&mut self, name: &str) -> Result<Option<CachedSafe>> {
        let req = SearchRequest { name: name.to_string() };
        let (msg_type, payload) = self.round_trip(MsgType::Search, &req.encode()?)?;
        match msg_type {
            MsgType::Search => {
                let reply = SearchReply::decode(&payload)?;
                Ok(Some(CachedSafe { password: reply.password, metadata: reply.metadata }))
            }
            MsgType::Error => {
                let err = ErrorReply::decode(&payload)?;
                if err.err_no == libc::ENOENT {
                    Ok(None)
                } else {
                    Err(Error::Errno(err.err_no))
                }
            }
            _ => Err(Error::InvalidMsg),
        }
    }

    /// The protocol has no `Store` reply (the original client fire-and-
    /// forgets it too), so this just writes the frame and returns.
    fn store(&mut self, name: &str, password: &[u8], metadata: &[u8], timeout: Option<u64>) -> Result<()> {
        let req = StoreRequest {
            timeout: timeout.map(|t| t as i64).unwrap_or(-1),
            name: name.to_string(),
            password: password.to_vec(),
            metadata: metadata.to_vec(),
        };
        write_frame(&mut self.stream, MsgType::Store, &req.encode()?)?;
        Ok(())
    }

    fn discard(&mut self, name: &str) -> Result<bool> {
        let req = DiscardRequest { name: name.to_string() };
        let (msg_type, payload) = self.round_trip(MsgType::Discard, &req.encode()?)?;
        match msg_type {
            MsgType::Discard => Ok(DiscardReply::decode(&payload)?.ok),
            MsgType::Error => {
                let err = ErrorReply::decode(&payload)?;
                Err(Error::Errno(err.err_no))
            }
            _ => Err(Error::InvalidMsg),
        }
    }
}
