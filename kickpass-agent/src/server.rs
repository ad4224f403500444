//! Agent server: a single-threaded, readiness-driven event loop over a
//! Unix domain socket, an ordered cache of decrypted safes, and a
//! min-heap of pending discard timers. Every connection is driven purely
//! by mio readiness — reads and writes are non-blocking and partial
//! frames are buffered per connection, so one slow or partial client can
//! never stall another connection or a pending discard timer.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use mio::net::{UnixListener, UnixStream};
use mio::{Events, Interest, Poll, Token};

use kickpass_core::error::{Error, Result};
use kickpass_proto::message::{DiscardReply, DiscardRequest, ErrorReply, SearchRequest, StoreRequest};
use kickpass_proto::{write_frame, MsgType};

const LISTENER_TOKEN: Token = Token(0);
const MAX_FRAME_LEN: usize = StoreRequest::SIZE;
const READ_CHUNK: usize = 8192;

struct CacheEntry {
    password: Vec<u8>,
    metadata: Vec<u8>,
    generation: u64,
}

struct Connection {
    stream: UnixStream,
    incoming: Vec<u8>,
    outgoing: Vec<u8>,
    writable: bool,
}

impl Connection {
    fn new(stream: UnixStream) -> Self {
        Connection { stream, incoming: Vec::new(), outgoing: Vec::new(), writable: false }
    }
}

/// Runs the agent's event loop until the socket is removed out from under
/// it or an unrecoverable I/O error occurs. Never returns on the happy
/// path short of process shutdown.
pub struct Agent {
    socket_path: PathBuf,
    poll: Poll,
    listener: UnixListener,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    cache: BTreeMap<String, CacheEntry>,
    next_generation: u64,
    expirations: BinaryHeap<Reverse<(Instant, u64, String)>>,
    watch_child: Option<nix::unistd::Pid>,
}

impl Agent {
    pub fn bind(socket_path: &Path) -> Result<Self> {
        let mut listener = UnixListener::bind(socket_path)?;
        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Agent {
            socket_path: socket_path.to_path_buf(),
            poll,
            listener,
            connections: HashMap::new(),
            next_token: 1,
            cache: BTreeMap::new(),
            next_generation: 0,
            expirations: BinaryHeap::new(),
            watch_child: None,
        })
    }

    /// Exits `run()` once the given process (a spawned `agent <cmd>
    /// <args...>` subcommand) has terminated, matching the original's
    /// `SIGCHLD`-driven shutdown.
    pub fn watch_child(&mut self, pid: nix::unistd::Pid) {
        self.watch_child = Some(pid);
    }

    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(128);
        loop {
            // A short upper bound on the poll timeout keeps the child-exit
            // check responsive even when no discard timer is pending.
            let timeout = self.next_timeout().unwrap_or(Duration::from_millis(200)).min(Duration::from_millis(200));
            self.poll.poll(&mut events, Some(timeout))?;

            for event in events.iter() {
                let token = event.token();
                if token == LISTENER_TOKEN {
                    self.accept_all()?;
                    continue;
                }

                if event.is_readable() {
                    if let Err(e) = self.handle_readable(token) {
                        log::debug!("connection {:?} closed: {}", token, e);
                        self.close(token);
                        continue;
                    }
                }
                if event.is_writable() {
                    if let Err(e) = self.handle_writable(token) {
                        log::debug!("connection {:?} closed: {}", token, e);
                        self.close(token);
                    }
                }
            }

            self.fire_expired();

            if self.child_has_exited()? {
                log::info!("watched child exited, shutting down agent");
                return Ok(());
            }
        }
    }

    fn close(&mut self, token: Token) {
        if let Some(mut conn) = self.connections.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }

    fn child_has_exited(&self) -> Result<bool> {
        use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};

        let Some(pid) = self.watch_child else { return Ok(false) };
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => Ok(false),
            Ok(_) => Ok(true),
            Err(nix::Error::ECHILD) => Ok(true),
            Err(e) => Err(Error::Errno(e as i32)),
        }
    }

    fn next_timeout(&self) -> Option<Duration> {
        self.expirations.peek().map(|Reverse((at, _, _))| at.saturating_duration_since(Instant::now()))
    }

    fn fire_expired(&mut self) {
        let now = Instant::now();
        while matches!(self.expirations.peek(), Some(Reverse((at, _, _))) if *at <= now) {
            let (_, generation, name) = self.expirations.pop().unwrap().0;
            if matches!(self.cache.get(&name), Some(entry) if entry.generation == generation) {
                log::debug!("discarding expired cache entry for {}", name);
                self.cache.remove(&name);
            }
        }
    }

    fn accept_all(&mut self) -> Result<()> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, _addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;
                    self.poll.registry().register(&mut stream, token, Interest::READABLE)?;
                    self.connections.insert(token, Connection::new(stream));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Drains whatever is currently available on the socket without
    /// blocking, pulls as many complete frames as have arrived out of the
    /// connection's accumulator, and dispatches each one. A partial frame
    /// is left buffered for the next readable event rather than waited
    /// on.
    fn handle_readable(&mut self, token: Token) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let conn = self.connections.get_mut(&token).ok_or(Error::EInternal)?;
            match conn.stream.read(&mut chunk) {
                Ok(0) => return Err(Error::EInternal), // peer closed
                Ok(n) => conn.incoming.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        loop {
            let frame = {
                let conn = self.connections.get_mut(&token).ok_or(Error::EInternal)?;
                match take_frame(&mut conn.incoming)? {
                    Some(frame) => frame,
                    None => break,
                }
            };
            let reply = self.dispatch(frame.0, &frame.1);
            if let Some(bytes) = reply {
                let conn = self.connections.get_mut(&token).ok_or(Error::EInternal)?;
                conn.outgoing.extend_from_slice(&bytes);
            }
        }

        self.flush(token)
    }

    fn handle_writable(&mut self, token: Token) -> Result<()> {
        self.flush(token)
    }

    /// Writes as much of the pending reply as the socket will accept
    /// right now; if anything remains, registers for `WRITABLE` so the
    /// reactor wakes this connection again instead of blocking on it.
    fn flush(&mut self, token: Token) -> Result<()> {
        let conn = self.connections.get_mut(&token).ok_or(Error::EInternal)?;
        while !conn.outgoing.is_empty() {
            match conn.stream.write(&conn.outgoing) {
                Ok(0) => return Err(Error::EInternal),
                Ok(n) => conn.outgoing.drain(..n).for_each(drop),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }

        let want_writable = !conn.outgoing.is_empty();
        if want_writable != conn.writable {
            conn.writable = want_writable;
            let interest = if want_writable { Interest::READABLE | Interest::WRITABLE } else { Interest::READABLE };
            self.poll.registry().reregister(&mut conn.stream, token, interest)?;
        }
        Ok(())
    }

    /// Handles one decoded frame and returns the reply frame to queue for
    /// the client, if the protocol defines one. `Store` has no reply
    /// (the client fire-and-forgets it, matching the original agent
    /// protocol), so it always returns `None` on success.
    fn dispatch(&mut self, msg_type: MsgType, payload: &[u8]) -> Option<Vec<u8>> {
        match msg_type {
            MsgType::Store => {
                let req = match StoreRequest::decode(payload) {
                    Ok(r) => r,
                    Err(_) => return Some(encode_error(Error::InvalidMsg)),
                };
                self.next_generation += 1;
                let generation = self.next_generation;
                self.cache.insert(
                    req.name.clone(),
                    CacheEntry { password: req.password, metadata: req.metadata, generation },
                );
                if req.timeout > 0 {
                    let at = Instant::now() + Duration::from_secs(req.timeout as u64);
                    self.expirations.push(Reverse((at, generation, req.name)));
                }
                None
            }
            MsgType::Search => {
                let req = match SearchRequest::decode(payload) {
                    Ok(r) => r,
                    Err(_) => return Some(encode_error(Error::InvalidMsg)),
                };
                match self.cache.get(&req.name) {
                    Some(entry) => {
                        let reply = StoreRequest {
                            timeout: 0,
                            name: req.name,
                            password: entry.password.clone(),
                            metadata: entry.metadata.clone(),
                        };
                        match reply.encode() {
                            Ok(bytes) => Some(encode_frame(MsgType::Search, &bytes)),
                            Err(_) => Some(encode_error(Error::InvalidMsg)),
                        }
                    }
                    None => Some(encode_error(Error::Errno(libc::ENOENT))),
                }
            }
            MsgType::Discard => {
                let req = match DiscardRequest::decode(payload) {
                    Ok(r) => r,
                    Err(_) => return Some(encode_error(Error::InvalidMsg)),
                };
                let existed = self.cache.remove(&req.name).is_some();
                if existed {
                    Some(encode_frame(MsgType::Discard, &DiscardReply { ok: true }.encode()))
                } else {
                    Some(encode_error(Error::Errno(libc::ENOENT)))
                }
            }
            MsgType::Error => Some(encode_error(Error::InvalidMsg)),
        }
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
        if let Some(parent) = self.socket_path.parent() {
            let _ = std::fs::remove_dir(parent);
        }
    }
}

fn encode_frame(msg_type: MsgType, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    write_frame(&mut out, msg_type, payload).expect("writing a frame to a Vec never fails");
    out
}

fn encode_error(err: Error) -> Vec<u8> {
    let err_no = match err {
        Error::Errno(n) => n,
        other => kickpass_core::error::kind_code(&other),
    };
    let reply = ErrorReply { err: kickpass_core::error::kind_code(&err), err_no };
    encode_frame(MsgType::Error, &reply.encode())
}

/// Pulls one complete frame off the front of `incoming`, if one has fully
/// arrived yet, leaving any trailing partial frame buffered. A declared
/// length above the largest known payload is rejected outright so a bad
/// length can't hold the connection's buffer open forever.
fn take_frame(incoming: &mut Vec<u8>) -> Result<Option<(MsgType, Vec<u8>)>> {
    if incoming.len() < 5 {
        return Ok(None);
    }
    let msg_type = MsgType::from_u8(incoming[0])?;
    let len = u32::from_be_bytes(incoming[1..5].try_into().unwrap()) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::InvalidMsg);
    }
    if incoming.len() < 5 + len {
        return Ok(None);
    }
    let payload = incoming[5..5 + len].to_vec();
    incoming.drain(0..5 + len);
    Ok(Some((msg_type, payload)))
}
