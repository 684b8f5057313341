//! Test utilities & fixtures.
//!
//! Provides the static catalog fixture tree under `tests/test-data-int`
//! and a scripted in-process RCON server. The mock speaks the wire
//! format with its own hand-rolled reader/writer so protocol tests do
//! not validate the client codec against itself.

// Each integration binary compiles this module; none of them uses every
// helper.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const TYPE_AUTH: i32 = 3;
pub const TYPE_COMMAND: i32 = 2;
pub const TYPE_AUTH_RESPONSE: i32 = 2;
pub const TYPE_RESPONSE: i32 = 0;

/// Return the path to the static integration test fixture directory.
pub fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("test-data-int")
}

/// One packet as seen by the mock server.
#[derive(Debug, Clone)]
pub struct WirePacket {
    pub id: i32,
    pub ptype: i32,
    pub body: String,
}

/// Read one whole packet off the socket.
pub async fn read_packet(stream: &mut TcpStream) -> WirePacket {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.expect("packet length");
    let len = i32::from_le_bytes(len_buf) as usize;
    assert!(len >= 10, "remainder too short: {}", len);
    let mut rest = vec![0u8; len];
    stream.read_exact(&mut rest).await.expect("packet remainder");
    assert_eq!(&rest[len - 2..], &[0, 0], "missing NUL padding");
    WirePacket {
        id: i32::from_le_bytes(rest[0..4].try_into().unwrap()),
        ptype: i32::from_le_bytes(rest[4..8].try_into().unwrap()),
        body: String::from_utf8_lossy(&rest[8..len - 2]).into_owned(),
    }
}

/// Write one packet in a single syscall.
pub async fn write_packet(stream: &mut TcpStream, id: i32, ptype: i32, body: &str) {
    let remainder = body.len() + 10;
    let mut wire = Vec::with_capacity(4 + remainder);
    wire.extend((remainder as i32).to_le_bytes());
    wire.extend(id.to_le_bytes());
    wire.extend(ptype.to_le_bytes());
    wire.extend(body.as_bytes());
    wire.extend([0, 0]);
    stream.write_all(&wire).await.expect("write packet");
}

/// Bind an ephemeral port, accept exactly one connection, and hand it
/// to `handler`.
pub async fn spawn_server<F, Fut>(handler: F) -> SocketAddr
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        handler(stream).await;
    });
    addr
}

/// Accept the login packet and approve it.
pub async fn accept_auth(stream: &mut TcpStream, expected_password: &str) {
    let auth = read_packet(stream).await;
    assert_eq!(auth.ptype, TYPE_AUTH);
    assert_eq!(auth.body, expected_password);
    write_packet(stream, auth.id, TYPE_AUTH_RESPONSE, "").await;
}

/// Accept the login packet and reject it with the -1 failure id.
pub async fn reject_auth(stream: &mut TcpStream) {
    let auth = read_packet(stream).await;
    assert_eq!(auth.ptype, TYPE_AUTH);
    write_packet(stream, -1, TYPE_AUTH_RESPONSE, "").await;
}

/// Read one command plus its end-of-response probe.
/// Returns `(command_id, sentinel_id, body)`.
pub async fn read_command(stream: &mut TcpStream) -> (i32, i32, String) {
    let cmd = read_packet(stream).await;
    assert_eq!(cmd.ptype, TYPE_COMMAND);
    let probe = read_packet(stream).await;
    assert_eq!(probe.ptype, TYPE_RESPONSE);
    assert_eq!(probe.body, "");
    (cmd.id, probe.id, cmd.body)
}

/// Respond to a command in one fragment, then echo the probe.
pub async fn respond(stream: &mut TcpStream, command_id: i32, sentinel_id: i32, body: &str) {
    write_packet(stream, command_id, TYPE_RESPONSE, body).await;
    write_packet(stream, sentinel_id, TYPE_RESPONSE, "").await;
}
