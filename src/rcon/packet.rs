//! Source RCON wire codec.
//!
//! Every packet on the wire is:
//!
//!   `<length:i32le><request_id:i32le><type:i32le><body bytes>\0\0`
//!
//! where `length` counts everything after itself. The body is UTF-8 and
//! NUL-terminated; the final byte is a padding NUL, so the minimum
//! remainder is 10 bytes. This module provides the packet value type,
//! the encoder, and a small incremental framer that can be fed arbitrary
//! socket chunks and yields whole packets when available.

use bytes::{Buf, BufMut, BytesMut};

use crate::errors::AdminError;

/// Serverbound: login request carrying the password.
pub const TYPE_AUTH: i32 = 3;
/// Serverbound: execute a command. Clientbound: auth response.
pub const TYPE_EXEC_COMMAND: i32 = 2;
/// Clientbound: command-response fragment. Also sent empty by the
/// client as the end-of-response probe.
pub const TYPE_RESPONSE_VALUE: i32 = 0;

/// Request id the server uses to signal a rejected password.
pub const AUTH_FAILURE_ID: i32 = -1;

/// Longest command body the server accepts.
pub const MAX_OUTBOUND_BODY: usize = 1446;
/// Response fragments carry at most 4096 payload bytes; anything whose
/// remainder exceeds this is a protocol violation.
pub const MAX_INBOUND_REMAINDER: usize = 4096 + MIN_REMAINDER;
/// id + type + body NUL + pad NUL.
const MIN_REMAINDER: usize = 10;

/// One decoded protocol packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: i32,
    pub ptype: i32,
    pub body: String,
}

impl Packet {
    pub fn auth(id: i32, password: &str) -> Self {
        Packet {
            id,
            ptype: TYPE_AUTH,
            body: password.to_string(),
        }
    }

    pub fn command(id: i32, body: &str) -> Self {
        Packet {
            id,
            ptype: TYPE_EXEC_COMMAND,
            body: body.to_string(),
        }
    }

    /// Empty response-value probe sent after a command; the server
    /// answers requests in order, so its echo marks end-of-response.
    pub fn sentinel(id: i32) -> Self {
        Packet {
            id,
            ptype: TYPE_RESPONSE_VALUE,
            body: String::new(),
        }
    }

    /// Encode for the wire. The body must fit the outbound limit and
    /// cannot contain NUL (it would terminate the body early).
    pub fn encode(&self) -> Result<Vec<u8>, AdminError> {
        if self.body.len() > MAX_OUTBOUND_BODY {
            return Err(AdminError::Validation(format!(
                "command body is {} bytes, server limit is {}",
                self.body.len(),
                MAX_OUTBOUND_BODY
            )));
        }
        if self.body.contains('\0') {
            return Err(AdminError::Validation(
                "command body contains a NUL byte".to_string(),
            ));
        }
        let remainder = self.body.len() + MIN_REMAINDER;
        let mut buf = BytesMut::with_capacity(4 + remainder);
        buf.put_i32_le(remainder as i32);
        buf.put_i32_le(self.id);
        buf.put_i32_le(self.ptype);
        buf.put_slice(self.body.as_bytes());
        buf.put_u8(0);
        buf.put_u8(0);
        Ok(buf.to_vec())
    }
}

/// Incremental packet framer. Push raw socket chunks in, pull whole
/// packets out; a single read is never assumed to contain a whole
/// packet, or only one.
pub struct PacketFramer {
    buf: BytesMut,
}

impl PacketFramer {
    pub fn new() -> Self {
        PacketFramer {
            buf: BytesMut::with_capacity(4096),
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Discard any buffered bytes (connection teardown).
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Attempt to extract the next complete packet. Returns `Ok(None)`
    /// when more bytes are needed. Unlike a lossy transport framer this
    /// one does not resynchronize: TCP is reliable, so a malformed
    /// length or padding means the peer is not speaking this protocol
    /// and the connection must be torn down.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, AdminError> {
        if self.buf.len() < 4 {
            return Ok(None);
        }
        let remainder = i32::from_le_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]);
        if remainder < MIN_REMAINDER as i32 || remainder as usize > MAX_INBOUND_REMAINDER {
            return Err(AdminError::Protocol(format!(
                "frame length {} outside {}..={}",
                remainder,
                MIN_REMAINDER,
                MAX_INBOUND_REMAINDER
            )));
        }
        let remainder = remainder as usize;
        if self.buf.len() < 4 + remainder {
            return Ok(None);
        }

        self.buf.advance(4);
        let frame = self.buf.split_to(remainder);
        let id = i32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let ptype = i32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
        if frame[remainder - 2] != 0 || frame[remainder - 1] != 0 {
            return Err(AdminError::Protocol("missing NUL padding".to_string()));
        }
        let body = String::from_utf8_lossy(&frame[8..remainder - 2]).into_owned();
        Ok(Some(Packet { id, ptype, body }))
    }
}

impl Default for PacketFramer {
    fn default() -> Self {
        PacketFramer::new()
    }
}
