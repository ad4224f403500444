pub mod client;
pub mod daemonize;
pub mod server;

pub use client::UnixAgentClient;
