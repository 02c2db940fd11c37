//! Per-connection session worker
//!
//! A session owns the socket of one admitted connection. It reassembles
//! newline-terminated lines from the bytes it reads, hands each complete
//! line to the dispatcher under the registry lock, and writes out every line
//! the registry queued for this connection.
//!
//! A session starts unregistered and becomes registered once the registry
//! accepts its `REG`; that state lives in the registry slot, not here.
//!
//! The session ends when the peer closes, on a read or write error, when a
//! line grows past `MAX_MESSAGE_LENGTH` bytes, or when the registry drops the
//! connection (elimination, failed delivery, server shutdown). In every case
//! the player has left the registry exactly once and the socket is closed.
//! A dropped connection still gets every line queued before the drop, so an
//! eliminated player sees its final `HIT` and `GG`.

use crate::connection::{ClientId, Outbox};
use crate::dispatcher::dispatch;
use crate::registry::{Admission, SharedRegistry, SlotId};
use log::{debug, info, warn};
use moab_shared::MAX_MESSAGE_LENGTH;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const READ_CHUNK: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("line exceeds {} bytes", MAX_MESSAGE_LENGTH)]
pub struct LineTooLong;

/// Accumulates bytes until a `\n` completes a line
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. Yields the line, without its terminator, once `\n`
    /// arrives. Fails as soon as the pending bytes reach the length limit
    /// with no terminator, so the longest accepted line is 99 bytes + `\n`.
    pub fn push(&mut self, byte: u8) -> Result<Option<String>, LineTooLong> {
        if byte == b'\n' {
            let line = String::from_utf8_lossy(&self.buffer).into_owned();
            self.buffer.clear();
            return Ok(Some(line));
        }

        self.buffer.push(byte);
        if self.buffer.len() >= MAX_MESSAGE_LENGTH {
            return Err(LineTooLong);
        }
        Ok(None)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    RemoteClosed,
    ReadError,
    WriteError,
    LineTooLong,
    /// The registry dropped the connection
    Removed,
}

pub struct Session<S> {
    slot: SlotId,
    client: ClientId,
    registry: SharedRegistry,
    stream: S,
    outbox: Outbox,
    lines: LineAssembler,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(admission: Admission, stream: S, registry: SharedRegistry) -> Self {
        Self {
            slot: admission.slot,
            client: admission.client,
            registry,
            stream,
            outbox: admission.outbox,
            lines: LineAssembler::new(),
        }
    }

    /// Serves the connection until it ends, then leaves the registry and
    /// closes the stream
    pub async fn run(mut self) -> SessionEnd {
        let end = self.serve().await;

        // A removed connection has already been taken out of its slot,
        // which may belong to somebody else by now.
        if end == SessionEnd::Removed {
            self.flush_outbox().await;
        } else {
            self.registry.lock().await.leave(self.slot, self.client);
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!("Client {}: shutdown failed: {}", self.client, e);
        }

        info!(
            "Client {} in slot {} disconnected ({:?})",
            self.client, self.slot, end
        );
        end
    }

    async fn serve(&mut self) -> SessionEnd {
        let mut buffer = [0u8; READ_CHUNK];

        loop {
            tokio::select! {
                outgoing = self.outbox.recv() => match outgoing {
                    Some(line) => {
                        if let Err(e) = self.stream.write_all(line.as_bytes()).await {
                            warn!("Client {}: write failed: {}", self.client, e);
                            return SessionEnd::WriteError;
                        }
                    }
                    None => return SessionEnd::Removed,
                },
                read = self.stream.read(&mut buffer) => match read {
                    Ok(0) => return SessionEnd::RemoteClosed,
                    Ok(n) => {
                        if let Some(end) = self.handle_bytes(&buffer[..n]).await {
                            return end;
                        }
                    }
                    Err(e) => {
                        warn!("Client {}: read failed: {}", self.client, e);
                        return SessionEnd::ReadError;
                    }
                },
            }
        }
    }

    /// Writes out what was queued before the registry dropped this
    /// connection. The registry no longer holds the sender, so this ends
    /// once the queue is empty.
    async fn flush_outbox(&mut self) {
        while let Some(line) = self.outbox.recv().await {
            if let Err(e) = self.stream.write_all(line.as_bytes()).await {
                debug!("Client {}: final flush failed: {}", self.client, e);
                return;
            }
        }
    }

    async fn handle_bytes(&mut self, bytes: &[u8]) -> Option<SessionEnd> {
        for &byte in bytes {
            match self.lines.push(byte) {
                Ok(None) => {}
                Ok(Some(line)) => {
                    if let Some(end) = self.handle_line(&line).await {
                        return Some(end);
                    }
                }
                Err(LineTooLong) => {
                    warn!("Client {}: message too long, disconnecting", self.client);
                    return Some(SessionEnd::LineTooLong);
                }
            }
        }
        None
    }

    async fn handle_line(&mut self, line: &str) -> Option<SessionEnd> {
        let mut registry = self.registry.lock().await;

        // Lines still buffered after an elimination must not act on the slot
        if !registry.holds(self.slot, self.client) {
            return Some(SessionEnd::Removed);
        }

        debug!("Client {}: {}", self.client, line);
        if let Some(reply) = dispatch(&mut registry, self.slot, line) {
            registry.send_to(self.slot, &reply);
        }
        None
    }
}
