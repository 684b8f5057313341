//! # RCON Protocol Client
//!
//! Owns the TCP socket to the game server: connection, the password
//! handshake, request/response framing, and reassembly of fragmented
//! responses. The protocol is strictly request/response; this client
//! never has more than one command outstanding.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! Disconnected → Connecting → Authenticating → Ready ⇄ Awaiting
//! ```
//!
//! `Disconnected` is reachable from every state: any transport failure,
//! protocol violation, or timeout tears the connection down, and a
//! rejected password closes it immediately (a failed password is never
//! retried by this layer).
//!
//! ## Fragmentation
//!
//! Large responses arrive split across multiple packets. After sending
//! a command with id `n` the client sends an empty response-value probe
//! with id `n + 1`; because the server answers requests in order, the
//! probe's echo marks the end of the response. Fragment bodies are
//! concatenated in arrival order, and packets whose id matches neither
//! the command nor the probe are stale leftovers and dropped. If the
//! probe echo never arrives within the response bound the partial
//! output is discarded, never surfaced as if complete.

pub mod packet;

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::errors::AdminError;
use crate::logutil::escape_log;
use packet::{Packet, PacketFramer, AUTH_FAILURE_ID, TYPE_RESPONSE_VALUE};

/// How long to wait for the TCP connect to complete.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default bound for a complete (possibly fragmented) response.
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Protocol client connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    /// A command has been sent and its response is being reassembled.
    Awaiting,
}

/// Server-reported failure classes recognized in response text.
///
/// The server reports rejections in prose; these prefixes cover the
/// vanilla command dispatcher's failure strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownCommand,
    InvalidArgument,
    ServerError,
}

/// Outcome of one dispatched command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Full reassembled response text, exactly as the server sent it.
    pub raw_response: String,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
}

impl CommandResult {
    /// Classify a reassembled response body.
    pub fn from_response(raw: String) -> Self {
        let error_kind = if raw.starts_with("Unknown or incomplete command") {
            Some(ErrorKind::UnknownCommand)
        } else if raw.starts_with("Incorrect argument") || raw.starts_with("Invalid ") {
            Some(ErrorKind::InvalidArgument)
        } else if raw.starts_with("An unexpected error occurred") {
            Some(ErrorKind::ServerError)
        } else {
            None
        };
        CommandResult {
            success: error_kind.is_none(),
            error_kind,
            raw_response: raw,
        }
    }
}

/// The protocol client. One instance owns at most one connection.
pub struct RconClient {
    state: ConnectionState,
    stream: Option<TcpStream>,
    framer: PacketFramer,
    next_id: i32,
    response_timeout: Duration,
}

impl RconClient {
    pub fn new() -> Self {
        RconClient {
            state: ConnectionState::Disconnected,
            stream: None,
            framer: PacketFramer::new(),
            next_id: 1,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Override the response reassembly bound.
    pub fn with_response_timeout(mut self, bound: Duration) -> Self {
        self.response_timeout = bound;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    /// Open the TCP connection. Leaves the client in `Authenticating`,
    /// waiting for the password handshake. Any existing connection is
    /// closed first.
    pub async fn connect(&mut self, host: &str, port: u16) -> Result<(), AdminError> {
        self.close();
        self.state = ConnectionState::Connecting;
        debug!("rcon: connecting to {}:{}", host, port);

        let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.state = ConnectionState::Disconnected;
                return Err(AdminError::Connection(format!(
                    "cannot reach {}:{}: {}",
                    host, port, e
                )));
            }
            Err(_) => {
                self.state = ConnectionState::Disconnected;
                return Err(AdminError::Connection(format!(
                    "connect to {}:{} timed out",
                    host, port
                )));
            }
        };

        stream.set_nodelay(true).ok();
        self.stream = Some(stream);
        self.next_id = 1;
        self.state = ConnectionState::Authenticating;
        Ok(())
    }

    /// Run the password handshake. On rejection the connection is
    /// closed and the caller must reconnect to try again.
    pub async fn authenticate(&mut self, password: &str) -> Result<(), AdminError> {
        if self.state != ConnectionState::Authenticating {
            return Err(AdminError::Connection(format!(
                "authenticate called in state {:?}",
                self.state
            )));
        }

        let id = self.take_id();
        let result = self.authenticate_inner(id, password).await;
        if result.is_err() {
            self.close();
        }
        result
    }

    async fn authenticate_inner(&mut self, id: i32, password: &str) -> Result<(), AdminError> {
        self.send(&Packet::auth(id, password)).await?;

        let deadline = Instant::now() + self.response_timeout;
        loop {
            let pkt = self.read_packet(deadline).await?;
            // Some servers send an empty response-value packet ahead of
            // the auth response; skip anything that is not the verdict.
            if pkt.ptype == TYPE_RESPONSE_VALUE {
                trace!("rcon: skipping pre-auth response-value packet");
                continue;
            }
            if pkt.id == AUTH_FAILURE_ID {
                return Err(AdminError::Authentication(
                    "server rejected the password".to_string(),
                ));
            }
            if pkt.id != id {
                return Err(AdminError::Authentication(format!(
                    "auth response correlation id {} does not match request {}",
                    pkt.id, id
                )));
            }
            debug!("rcon: authenticated");
            self.state = ConnectionState::Ready;
            return Ok(());
        }
    }

    /// Send one command and reassemble its complete response. Only
    /// callable from `Ready`.
    pub async fn execute(&mut self, command: &str) -> Result<CommandResult, AdminError> {
        if self.state != ConnectionState::Ready {
            return Err(AdminError::Connection(format!(
                "execute called in state {:?}",
                self.state
            )));
        }

        self.state = ConnectionState::Awaiting;
        let command_id = self.take_id();
        let sentinel_id = self.take_id();
        debug!("rcon: execute id={} cmd={}", command_id, escape_log(command));

        let result = self.execute_inner(command_id, sentinel_id, command).await;
        match &result {
            Ok(res) => {
                self.state = ConnectionState::Ready;
                trace!(
                    "rcon: response id={} ({} bytes): {}",
                    command_id,
                    res.raw_response.len(),
                    escape_log(&res.raw_response)
                );
            }
            Err(e) => {
                warn!("rcon: execute id={} failed: {}", command_id, e);
                self.close();
            }
        }
        result
    }

    async fn execute_inner(
        &mut self,
        command_id: i32,
        sentinel_id: i32,
        command: &str,
    ) -> Result<CommandResult, AdminError> {
        self.send(&Packet::command(command_id, command)).await?;
        self.send(&Packet::sentinel(sentinel_id)).await?;

        let deadline = Instant::now() + self.response_timeout;
        let mut body = String::new();
        loop {
            let pkt = self.read_packet(deadline).await?;
            if pkt.id == sentinel_id {
                // Probe echo: the response is complete. Its own body
                // (usually an "unknown request" notice) is discarded.
                return Ok(CommandResult::from_response(body));
            }
            if pkt.id == command_id && pkt.ptype == TYPE_RESPONSE_VALUE {
                body.push_str(&pkt.body);
                continue;
            }
            // Stale response from an earlier, abandoned request.
            trace!(
                "rcon: discarding stale packet id={} type={}",
                pkt.id,
                pkt.ptype
            );
        }
    }

    /// Close the connection. Idempotent and safe from any state.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("rcon: connection closed");
        }
        self.framer.clear();
        self.state = ConnectionState::Disconnected;
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        // Monotonic per connection; wraps far beyond any realistic
        // session length but must never collide with the -1 failure id.
        self.next_id = self.next_id.checked_add(1).unwrap_or(1);
        id
    }

    async fn send(&mut self, pkt: &Packet) -> Result<(), AdminError> {
        let bytes = pkt.encode()?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| AdminError::Connection("not connected".to_string()))?;
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| AdminError::Connection(format!("send failed: {}", e)))?;
        Ok(())
    }

    /// Read the next whole packet, pulling more bytes from the socket
    /// as needed, respecting `deadline`.
    async fn read_packet(&mut self, deadline: Instant) -> Result<Packet, AdminError> {
        loop {
            if let Some(pkt) = self.framer.next_packet()? {
                return Ok(pkt);
            }
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| AdminError::Connection("not connected".to_string()))?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AdminError::Timeout(
                    "no complete response within bound".to_string(),
                ));
            }
            let mut buf = [0u8; 4096];
            let n = timeout(remaining, stream.read(&mut buf))
                .await
                .map_err(|_| {
                    AdminError::Timeout("no complete response within bound".to_string())
                })?
                .map_err(|e| AdminError::Connection(format!("read failed: {}", e)))?;
            if n == 0 {
                return Err(AdminError::Connection(
                    "connection closed by server".to_string(),
                ));
            }
            self.framer.push(&buf[..n]);
        }
    }
}

impl Default for RconClient {
    fn default() -> Self {
        RconClient::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_is_disconnected() {
        let client = RconClient::new();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_ready());
    }

    #[tokio::test]
    async fn test_execute_requires_ready() {
        let mut client = RconClient::new();
        let err = client.execute("list").await.unwrap_err();
        assert!(matches!(err, AdminError::Connection(_)));
    }

    #[tokio::test]
    async fn test_authenticate_requires_connection() {
        let mut client = RconClient::new();
        let err = client.authenticate("pw").await.unwrap_err();
        assert!(matches!(err, AdminError::Connection(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut client = RconClient::new();
        client.close();
        client.close();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_response_classification() {
        let ok = CommandResult::from_response("Gave 1 [Diamond Sword] to Steve".to_string());
        assert!(ok.success);
        assert!(ok.error_kind.is_none());

        let unknown =
            CommandResult::from_response("Unknown or incomplete command, see below".to_string());
        assert!(!unknown.success);
        assert_eq!(unknown.error_kind, Some(ErrorKind::UnknownCommand));

        let arg = CommandResult::from_response("Incorrect argument for command".to_string());
        assert_eq!(arg.error_kind, Some(ErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        let mut client = RconClient::new();
        // Port 1 on localhost is essentially never listening.
        let err = client.connect("127.0.0.1", 1).await.unwrap_err();
        assert!(matches!(err, AdminError::Connection(_)));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
