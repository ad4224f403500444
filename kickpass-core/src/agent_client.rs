//! The trait a safe talks to when an agent is reachable. Kept in
//! `kickpass-core` (rather than depending on `kickpass-agent` directly) so
//! the core never pulls in socket/reactor code; `kickpass-agent`'s real
//! client implements this trait.

use crate::error::Result;

pub struct CachedSafe {
    pub password: Vec<u8>,
    pub metadata: Vec<u8>,
}

/// `timeout = None` means "cache forever" (used when moving a cached entry
/// during `rename`); `Some(0)` is rejected by callers before it reaches
/// the trait.
pub trait AgentClient {
    fn search(&mut self, name: &str) -> Result<Option<CachedSafe>>;
    fn store(&mut self, name: &str, password: &[u8], metadata: &[u8], timeout: Option<u64>) -> Result<()>;
    fn discard(&mut self, name: &str) -> Result<bool>;
}
