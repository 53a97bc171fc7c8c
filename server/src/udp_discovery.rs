//! UDP discovery responder: replies to any datagram on the discovery port
//! with the server's TCP port as decimal ASCII.

use anyhow::Context;
use anyhow::Result;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub async fn run(udp_port: u16, tcp_port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], udp_port));
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("binding UDP discovery socket on {addr}"))?;
    tracing::info!(%addr, "UDP discovery responder listening");

    let reply = tcp_port.to_string();
    let mut buf = [0u8; 512];
    loop {
        let (_, src) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "UDP discovery recv failed");
                continue;
            }
        };
        if let Err(e) = socket.send_to(reply.as_bytes(), src).await {
            tracing::warn!(error = %e, %src, "UDP discovery reply failed");
        }
    }
}
