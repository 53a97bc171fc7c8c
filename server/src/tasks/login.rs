use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use std::net::IpAddr;
use std::net::SocketAddr;
use wq_commons::ProtocolError;

pub async fn run(
    ctx: &AppContext,
    connection: SocketAddr,
    nickname: &str,
    password: &str,
    udp_port: u16,
) -> Result<(), TaskError> {
    let result = login(ctx, connection, nickname, password, udp_port).await;

    let body = match &result {
        Ok(()) => "Login successful.\n".to_string(),
        Err(e) => format!("{e}\n"),
    };

    ctx.depot
        .send(Mail {
            destination: connection,
            body,
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;

    result.map_err(TaskError::from)
}

async fn login(
    ctx: &AppContext,
    connection: SocketAddr,
    nickname: &str,
    password: &str,
    udp_port: u16,
) -> Result<(), ProtocolError> {
    if !ctx.store.contains(nickname) {
        return Err(ProtocolError::UnknownUser(nickname.to_string()));
    }

    match ctx.store.check_password(nickname, password) {
        Some(true) => {}
        Some(false) => return Err(ProtocolError::WrongPassword),
        None => return Err(ProtocolError::UnknownUser(nickname.to_string())),
    }

    let udp_addr = SocketAddr::new(invite_ip(connection), udp_port);
    ctx.presence.login(connection, nickname, udp_addr)?;
    tracing::info!(%nickname, %connection, "login successful");
    Ok(())
}

fn invite_ip(connection: SocketAddr) -> IpAddr {
    connection.ip()
}
