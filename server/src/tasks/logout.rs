use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use crate::mail::LOGOUT_SUCCESS;
use std::net::SocketAddr;

/// Graceful logout, triggered by an explicit client request. Cleans up
/// presence and hands the sentinel response to the Mailman, which closes
/// the connection after writing it.
pub async fn run(ctx: &AppContext, connection: SocketAddr) -> Result<(), TaskError> {
    ctx.presence.logout(connection);

    ctx.depot
        .send(Mail {
            destination: connection,
            body: LOGOUT_SUCCESS.to_string(),
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;

    tracing::info!(%connection, "graceful logout");
    Ok(())
}

/// Brutal logout: the peer's socket was found closed (EOF) or otherwise
/// unusable. No response is owed; the connection task closes the socket
/// itself and never touches the Mailman for this cleanup.
pub fn brutal(ctx: &AppContext, connection: SocketAddr) {
    if let Some(nickname) = ctx.presence.logout(connection) {
        tracing::info!(%nickname, %connection, "brutal logout (peer disconnected)");
    }
}
