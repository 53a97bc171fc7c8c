//! Wire types shared between the server and anything that speaks its
//! protocol: the TCP control frame opcodes, the persisted user record shape,
//! and the protocol-level error strings that are part of the wire contract.

use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// A registered player.
///
/// This is the exact shape persisted in `Database.json`; field order and
/// names are part of the on-disk format, not just an in-memory convenience.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub nickname: String,
    #[serde(rename = "pwdHash")]
    pub pwd_hash: PasswordHash,
    pub score: i64,
    pub friends: Vec<String>,
}

impl User {
    pub fn new(nickname: impl Into<String>, pwd_hash: PasswordHash) -> Self {
        Self {
            nickname: nickname.into(),
            pwd_hash,
            score: 0,
            friends: Vec::new(),
        }
    }
}

/// Opaque comparator for a player's password.
///
/// Deliberately not a cryptographic hash: it reproduces the legacy 32-bit
/// fold so a `Database.json` written by an older build still authenticates
/// the same passwords. Never format or log the wrapped value.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PasswordHash(u32);

impl PasswordHash {
    /// FNV-1a style fold over the password's UTF-8 bytes.
    pub fn compute(password: &str) -> Self {
        let mut hash: u32 = 0x811c_9dc5;
        for byte in password.as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
        Self(hash)
    }

    pub fn matches(&self, password: &str) -> bool {
        *self == Self::compute(password)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Opcodes of the TCP control protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Login = 0,
    Logout = 1,
    AddFriend = 2,
    FriendList = 3,
    Score = 4,
    Scoreboard = 5,
    Match = 6,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Login,
            1 => Self::Logout,
            2 => Self::AddFriend,
            3 => Self::FriendList,
            4 => Self::Score,
            5 => Self::Scoreboard,
            6 => Self::Match,
            _ => return None,
        })
    }
}

/// Typed wire-level protocol errors. `Display` produces the exact response
/// string a client expects, so it can be written straight to the socket.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Login error: user {0} not found. Please register.")]
    UnknownUser(String),
    #[error("Login error: {0} is already logged in.")]
    AlreadyLoggedIn(String),
    #[error("Login error: this connection is already logged with another account.")]
    ConnectionAlreadyBound,
    #[error("Login error: wrong password.")]
    WrongPassword,
    #[error("Friend error: {0} is not registered.")]
    FriendNotRegistered(String),
    #[error("Friend error: you cannot be friends with yourself.")]
    SelfFriend,
    #[error("Friend error: you are already friends with {0}.")]
    AlreadyFriends(String),
    #[error("Match error: {0} is not your friend.")]
    NotFriends(String),
    #[error("Match error: {0} is not online.")]
    FriendOffline(String),
    #[error("Match error: invitation to {0} timed out.")]
    InvitationTimedOut(String),
    #[error("{0} refused your match invitation.")]
    InvitationRefused(String),
    #[error("You are not logged in.")]
    NotLoggedIn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_hashes_equal() {
        assert_eq!(PasswordHash::compute("hunter2"), PasswordHash::compute("hunter2"));
    }

    #[test]
    fn different_passwords_almost_certainly_differ() {
        assert_ne!(PasswordHash::compute("hunter2"), PasswordHash::compute("hunter3"));
    }

    #[test]
    fn matches_checks_against_plaintext() {
        let hash = PasswordHash::compute("swordfish");
        assert!(hash.matches("swordfish"));
        assert!(!hash.matches("wrong"));
    }

    #[test]
    fn opcode_round_trips() {
        for code in 0u8..=6 {
            assert!(OpCode::from_u8(code).is_some());
        }
        assert!(OpCode::from_u8(7).is_none());
    }
}
