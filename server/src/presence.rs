//! Tracks who is logged in and where to reach them.
//!
//! The two maps are kept behind a single lock so login/logout updates both
//! atomically: a nickname is in both maps or in neither.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::SocketAddr;
use wq_commons::ProtocolError;

#[derive(Default)]
struct Tables {
    /// connection's remote address -> logged-in nickname.
    by_connection: HashMap<SocketAddr, String>,
    /// nickname -> UDP address to send match invitations to.
    match_book: HashMap<String, SocketAddr>,
}

#[derive(Default)]
pub struct Presence {
    tables: RwLock<Tables>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `nickname` as online for `connection`, reachable for
    /// invitations at `udp_addr`.
    pub fn login(
        &self,
        connection: SocketAddr,
        nickname: &str,
        udp_addr: SocketAddr,
    ) -> Result<(), ProtocolError> {
        let mut tables = self.tables.write();

        if tables.by_connection.contains_key(&connection) {
            return Err(ProtocolError::ConnectionAlreadyBound);
        }
        if tables.match_book.contains_key(nickname) {
            return Err(ProtocolError::AlreadyLoggedIn(nickname.to_string()));
        }

        tables.by_connection.insert(connection, nickname.to_string());
        tables.match_book.insert(nickname.to_string(), udp_addr);
        Ok(())
    }

    /// Removes `connection`'s presence entry, if any, returning the
    /// nickname that was logged in.
    pub fn logout(&self, connection: SocketAddr) -> Option<String> {
        let mut tables = self.tables.write();
        let nickname = tables.by_connection.remove(&connection)?;
        tables.match_book.remove(&nickname);
        Some(nickname)
    }

    pub fn nickname_of(&self, connection: SocketAddr) -> Option<String> {
        self.tables.read().by_connection.get(&connection).cloned()
    }

    pub fn is_online(&self, nickname: &str) -> bool {
        self.tables.read().match_book.contains_key(nickname)
    }

    pub fn invite_address(&self, nickname: &str) -> Option<SocketAddr> {
        self.tables.read().match_book.get(nickname).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn login_then_logout_round_trips() {
        let presence = Presence::new();
        presence.login(addr(1), "alice", addr(2)).unwrap();

        assert!(presence.is_online("alice"));
        assert_eq!(presence.nickname_of(addr(1)), Some("alice".to_string()));

        let left = presence.logout(addr(1));
        assert_eq!(left, Some("alice".to_string()));
        assert!(!presence.is_online("alice"));
    }

    #[test]
    fn rejects_double_login_of_same_nickname() {
        let presence = Presence::new();
        presence.login(addr(1), "alice", addr(2)).unwrap();

        let err = presence.login(addr(3), "alice", addr(4)).unwrap_err();
        assert_eq!(err, ProtocolError::AlreadyLoggedIn("alice".to_string()));
    }

    #[test]
    fn rejects_second_login_on_same_connection() {
        let presence = Presence::new();
        presence.login(addr(1), "alice", addr(2)).unwrap();

        let err = presence.login(addr(1), "bob", addr(2)).unwrap_err();
        assert_eq!(err, ProtocolError::ConnectionAlreadyBound);
    }
}
