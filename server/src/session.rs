//! Live-session bookkeeping and broadcast fan-out.
//!
//! The server's main loop is the single owner of the session set; reader and
//! writer tasks only ever talk to it through messages. Outbound lines travel
//! over an unbounded per-session queue drained by that session's writer task,
//! so no lock is ever held across a network write and one slow or dead client
//! cannot stall delivery to the rest.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// One connected client: its id, peer address and outbound line queue.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned by the server.
    pub id: u32,
    /// Peer address, for log lines.
    pub addr: SocketAddr,
    /// Queue consumed by this session's writer task.
    sender: mpsc::UnboundedSender<String>,
}

impl Session {
    fn new(id: u32, addr: SocketAddr, sender: mpsc::UnboundedSender<String>) -> Self {
        Self { id, addr, sender }
    }

    /// Queues one protocol line for delivery, appending the line terminator.
    ///
    /// Returns false when the writer task is gone, which means the connection
    /// is dead and the session should be removed.
    pub fn send(&self, line: &str) -> bool {
        self.sender.send(format!("{}\n", line)).is_ok()
    }
}

/// The authoritative set of live sessions.
pub struct SessionManager {
    sessions: HashMap<u32, Session>,
    /// Next session id for new connections.
    next_session_id: u32,
}

impl SessionManager {
    /// Creates an empty session set. Session ids start from 1.
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_session_id: 1,
        }
    }

    /// Registers a new connection and returns its session id.
    pub fn add_session(&mut self, addr: SocketAddr, sender: mpsc::UnboundedSender<String>) -> u32 {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        info!("Session {} connected from {}", session_id, addr);
        self.sessions
            .insert(session_id, Session::new(session_id, addr, sender));

        session_id
    }

    /// Removes a session. Returns true if it was still live; a second removal
    /// of the same id (reader and writer both report the teardown) is a no-op.
    pub fn remove_session(&mut self, session_id: &u32) -> bool {
        if let Some(session) = self.sessions.remove(session_id) {
            info!("Session {} disconnected", session.id);
            true
        } else {
            false
        }
    }

    /// Queues a line for one session. Returns false for unknown or dead
    /// sessions.
    pub fn send_to(&self, session_id: u32, line: &str) -> bool {
        match self.sessions.get(&session_id) {
            Some(session) => session.send(line),
            None => false,
        }
    }

    /// Attempts to queue a line for every live session.
    ///
    /// Failed sessions are collected and returned; the caller removes them
    /// after the iteration completes, never during it, so one dead client
    /// cannot disturb delivery to the others.
    #[must_use]
    pub fn broadcast(&self, line: &str) -> Vec<u32> {
        let mut dead = Vec::new();

        for (session_id, session) in &self.sessions {
            if !session.send(line) {
                dead.push(*session_id);
            }
        }

        dead
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_add_and_remove_session() {
        let mut manager = SessionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = manager.add_session(test_addr(), tx);
        assert_eq!(id, 1);
        assert_eq!(manager.len(), 1);

        assert!(manager.remove_session(&id));
        assert!(!manager.remove_session(&id));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_session_ids_are_monotonic() {
        let mut manager = SessionManager::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        let a = manager.add_session(test_addr(), tx1);
        manager.remove_session(&a);
        let b = manager.add_session(test_addr2(), tx2);

        assert!(b > a);
    }

    #[test]
    fn test_send_appends_newline() {
        let mut manager = SessionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manager.add_session(test_addr(), tx);

        assert!(manager.send_to(id, "U 1 2 3 4 5"));
        assert_eq!(rx.try_recv().unwrap(), "U 1 2 3 4 5\n");
    }

    #[test]
    fn test_send_to_unknown_session() {
        let manager = SessionManager::new();
        assert!(!manager.send_to(42, "D 1"));
    }

    #[test]
    fn test_broadcast_reaches_all_sessions() {
        let mut manager = SessionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        manager.add_session(test_addr(), tx1);
        manager.add_session(test_addr2(), tx2);

        let dead = manager.broadcast("D 7");

        assert!(dead.is_empty());
        assert_eq!(rx1.try_recv().unwrap(), "D 7\n");
        assert_eq!(rx2.try_recv().unwrap(), "D 7\n");
    }

    #[test]
    fn test_broadcast_reports_dead_sessions_without_stalling_others() {
        let mut manager = SessionManager::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let dead_id = manager.add_session(test_addr(), tx1);
        manager.add_session(test_addr2(), tx2);

        // Simulate a torn-down writer task.
        drop(rx1);

        let dead = manager.broadcast("U 1 0 0 0 0");

        assert_eq!(dead, vec![dead_id]);
        assert_eq!(rx2.try_recv().unwrap(), "U 1 0 0 0 0\n");

        // Removal is applied after the iteration, by the caller.
        for session_id in dead {
            assert!(manager.remove_session(&session_id));
        }
        assert_eq!(manager.len(), 1);
    }
}
