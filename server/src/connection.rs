//! Outbound side of an admitted connection
//!
//! The registry never touches sockets. Each slot owns a `Connection`, the
//! sending half of a bounded queue of complete lines; the session serving
//! that socket drains the other half (`Outbox`) and writes it out.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identity of one accepted connection. Never reused, unlike slot ids.
pub type ClientId = u64;

/// Lines queued for a connection, drained onto the socket by its session.
pub type Outbox = mpsc::Receiver<String>;

/// Why a line could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The peer stopped reading and its queue filled up
    #[error("outbox is full")]
    Full,
    #[error("session has ended")]
    Closed,
}

/// Sending half of a connection, owned by its registry slot
#[derive(Debug)]
pub struct Connection {
    pub id: ClientId,
    pub addr: SocketAddr,
    outbound: mpsc::Sender<String>,
}

impl Connection {
    /// Creates the handle and the outbox it feeds, holding at most
    /// `capacity` undelivered lines
    pub fn new(id: ClientId, addr: SocketAddr, capacity: usize) -> (Self, Outbox) {
        let (outbound, outbox) = mpsc::channel(capacity);
        (Connection { id, addr, outbound }, outbox)
    }

    /// Queues a complete line (terminator included) without waiting
    pub fn send_line(&self, line: &str) -> Result<(), DeliveryError> {
        self.outbound.try_send(line.to_owned()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    #[test]
    fn test_lines_arrive_in_order() {
        let (connection, mut outbox) = Connection::new(1, test_addr(), 8);

        connection.send_line("JOIN A\n").unwrap();
        connection.send_line("MISS A 0 0\n").unwrap();

        assert_eq!(outbox.try_recv().unwrap(), "JOIN A\n");
        assert_eq!(outbox.try_recv().unwrap(), "MISS A 0 0\n");
        assert!(outbox.try_recv().is_err());
    }

    #[test]
    fn test_send_fails_once_outbox_is_gone() {
        let (connection, outbox) = Connection::new(7, test_addr(), 8);
        drop(outbox);

        assert_eq!(connection.send_line("GG A\n"), Err(DeliveryError::Closed));
    }

    #[test]
    fn test_send_fails_when_outbox_is_full() {
        let (connection, mut outbox) = Connection::new(2, test_addr(), 2);

        connection.send_line("MISS A 0 0\n").unwrap();
        connection.send_line("MISS A 0 1\n").unwrap();
        assert_eq!(
            connection.send_line("MISS A 0 2\n"),
            Err(DeliveryError::Full)
        );

        // Draining makes room again
        assert_eq!(outbox.try_recv().unwrap(), "MISS A 0 0\n");
        assert!(connection.send_line("MISS A 0 2\n").is_ok());
    }

    #[test]
    fn test_dropping_connection_closes_outbox() {
        let (connection, mut outbox) = Connection::new(3, test_addr(), 8);
        connection.send_line("GG A\n").unwrap();
        drop(connection);

        assert_eq!(outbox.try_recv().unwrap(), "GG A\n");
        assert_eq!(
            outbox.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        );
    }
}
