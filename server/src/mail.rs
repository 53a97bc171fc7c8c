//! The Mailman: a single consumer that serialises all outbound writes.
//! A registry of per-connection senders is populated at connect time and
//! drained by one forwarding task, so mails for the same connection are
//! always delivered in order.

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// The line written back to a client whose `logout` succeeded. The Mailman
/// recognises this exact payload and closes the connection after writing
/// it, instead of re-arming it for another read.
pub const LOGOUT_SUCCESS: &str = "Logout successful.\n";

/// A pending write, addressed to one connection.
pub struct Mail {
    pub destination: SocketAddr,
    pub body: String,
}

/// What a connection task should do in response to a delivered [`Mail`].
pub enum ConnCommand {
    Write(String),
    Close,
}

/// Handle each connection task registers itself under so the Mailman can
/// find it again.
pub type ConnSender = mpsc::Sender<ConnCommand>;

/// Shared table of live connections, keyed by remote address.
///
/// Mirrors `message.rs`'s `authenticated_users` map, except registration
/// happens at accept time rather than at login, since a connection needs to
/// receive error mails (e.g. "wrong password") before it is ever logged in.
#[derive(Clone, Default)]
pub struct MailRegistry {
    connections: Arc<DashMap<SocketAddr, ConnSender>>,
}

impl MailRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, addr: SocketAddr, sender: ConnSender) {
        self.connections.insert(addr, sender);
    }

    pub fn unregister(&self, addr: SocketAddr) {
        self.connections.remove(&addr);
    }

    fn get(&self, addr: SocketAddr) -> Option<ConnSender> {
        self.connections.get(&addr).map(|r| r.clone())
    }
}

/// The depot: the Mailman's inbox. Tasks hold a clone of the sender half
/// and enqueue mails; exactly one consumer task drains the receiver half.
pub type DepotSender = mpsc::Sender<Mail>;

const DEPOT_BUFFER_SIZE: usize = 256;

pub fn depot_channel() -> (DepotSender, mpsc::Receiver<Mail>) {
    mpsc::channel(DEPOT_BUFFER_SIZE)
}

/// Spawns the single Mailman task, draining `depot` and forwarding each
/// mail to the registered connection. Mails addressed to a connection that
/// has since disconnected are dropped with a warning, never retried.
pub fn spawn_mailman(
    mut depot: mpsc::Receiver<Mail>,
    registry: MailRegistry,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mail) = depot.recv().await {
            let Some(sender) = registry.get(mail.destination) else {
                tracing::warn!(destination = %mail.destination, "mail for disconnected client dropped");
                continue;
            };

            let command = if mail.body == LOGOUT_SUCCESS {
                ConnCommand::Close
            } else {
                ConnCommand::Write(mail.body.clone())
            };

            if sender.send(command).await.is_err() {
                tracing::warn!(destination = %mail.destination, "connection task gone before mail delivered");
            }

            if mail.body == LOGOUT_SUCCESS {
                registry.unregister(mail.destination);
            }
        }
    })
}
