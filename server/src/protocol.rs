//! Decoding of the TCP control protocol's request frames.
//!
//! Frames are not length-delimited: a reader consumes whatever is currently
//! available and splits at the first `\n` (or accepts a bare frame with no
//! trailing newline, for legacy clients). This module only decodes one
//! already-isolated frame into a typed [`Request`].

use anyhow::anyhow;
use anyhow::Result;
use wq_commons::OpCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login {
        nickname: String,
        password: String,
        udp_port: u16,
    },
    Logout,
    AddFriend {
        friend: String,
    },
    FriendList,
    Score,
    Scoreboard,
    Match {
        friend: String,
    },
}

/// Splits a raw read buffer into complete frames and any leftover partial
/// bytes to keep for the next read.
pub fn split_frames(buf: &str) -> (Vec<&str>, &str) {
    let mut frames = Vec::new();
    let mut rest = buf;
    while let Some(idx) = rest.find('\n') {
        let (frame, tail) = rest.split_at(idx);
        frames.push(frame);
        rest = &tail[1..];
    }
    (frames, rest)
}

pub fn parse(raw: &str) -> Result<Request> {
    let raw = raw.trim_end_matches(['\r', '\n']);
    let mut parts = raw.split(' ').filter(|s| !s.is_empty());
    let code: u8 = parts
        .next()
        .ok_or_else(|| anyhow!("empty frame"))?
        .parse()
        .map_err(|_| anyhow!("non-numeric opcode in frame: {raw:?}"))?;
    let opcode = OpCode::from_u8(code).ok_or_else(|| anyhow!("unknown opcode {code}"))?;

    let request = match opcode {
        OpCode::Login => {
            let nickname = parts.next().ok_or_else(|| anyhow!("login missing nickname"))?;
            let password = parts.next().ok_or_else(|| anyhow!("login missing password"))?;
            let udp_port: u16 = parts
                .next()
                .ok_or_else(|| anyhow!("login missing udp port"))?
                .parse()
                .map_err(|_| anyhow!("login udp port not numeric"))?;
            Request::Login {
                nickname: nickname.to_string(),
                password: password.to_string(),
                udp_port,
            }
        }
        OpCode::Logout => Request::Logout,
        OpCode::AddFriend => {
            let friend = parts.next().ok_or_else(|| anyhow!("add_friend missing target"))?;
            Request::AddFriend {
                friend: friend.to_string(),
            }
        }
        OpCode::FriendList => Request::FriendList,
        OpCode::Score => Request::Score,
        OpCode::Scoreboard => Request::Scoreboard,
        OpCode::Match => {
            let friend = parts.next().ok_or_else(|| anyhow!("match missing target"))?;
            Request::Match {
                friend: friend.to_string(),
            }
        }
    };

    Ok(request)
}
