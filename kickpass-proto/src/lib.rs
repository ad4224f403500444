//! The agent wire protocol: a small fixed-header framing scheme carrying
//! fixed-size typed payloads, mirroring `struct kp_unsafe`/`struct
//! kp_msg_error` from the original agent.

pub mod codec;
pub mod message;

pub use codec::{read_frame, write_frame};
pub use message::{
    DiscardReply, DiscardRequest, ErrorReply, Frame, MsgType, SearchReply, SearchRequest, StoreRequest,
};

/// Environment variable the agent publishes its socket path through.
pub const AGENT_SOCKET_ENV: &str = "KP_AGENT_SOCK";

/// Matches the original's `PATH_MAX`-sized name field.
pub const PATH_MAX: usize = 4096;
