//! The reactor: the TCP accept loop and the per-connection dispatch logic.
//! Each connection is split into an independent writer task and a
//! reader/dispatch task, joined by a local channel, so a slow or
//! long-running dispatch never blocks outbound delivery to that same
//! connection.

use crate::context::AppContext;
use crate::mail::ConnCommand;
use crate::protocol;
use crate::protocol::Request;
use crate::tasks;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::Semaphore;

const READ_BUFFER_SIZE: usize = 512;
const CONN_COMMAND_BUFFER: usize = 32;

pub async fn run(ctx: AppContext, tcp_port: u16, worker_threads: usize) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], tcp_port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "reactor listening");
    serve(ctx, listener, worker_threads).await
}

/// Runs the accept loop against an already-bound listener. Split out from
/// [`run`] so integration tests can bind an ephemeral port, learn its
/// address, and only then hand the listener off to the reactor.
pub async fn serve(ctx: AppContext, listener: TcpListener, worker_threads: usize) -> anyhow::Result<()> {
    let pool = Arc::new(Semaphore::new(worker_threads));

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted connection");
        tokio::spawn(handle_connection(ctx.clone(), pool.clone(), stream, peer));
    }
}

async fn handle_connection(
    ctx: AppContext,
    pool: Arc<Semaphore>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let (conn_tx, conn_rx) = mpsc::channel::<ConnCommand>(CONN_COMMAND_BUFFER);
    ctx.registry.register(peer, conn_tx);

    let (read_half, write_half) = stream.into_split();
    let writer = tokio::spawn(writer_loop(write_half, conn_rx));

    reader_loop(&ctx, &pool, read_half, peer).await;

    writer.abort();
    ctx.registry.unregister(peer);
}

async fn writer_loop(
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut conn_rx: mpsc::Receiver<ConnCommand>,
) {
    while let Some(cmd) = conn_rx.recv().await {
        match cmd {
            ConnCommand::Write(body) => {
                if write_half.write_all(body.as_bytes()).await.is_err() {
                    break;
                }
            }
            ConnCommand::Close => {
                let _ = write_half.shutdown().await;
                break;
            }
        }
    }
}

async fn reader_loop(
    ctx: &AppContext,
    pool: &Arc<Semaphore>,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    peer: SocketAddr,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut pending = String::new();

    loop {
        match read_half.read(&mut buf).await {
            Ok(0) | Err(_) => {
                tasks::logout::brutal(ctx, peer);
                return;
            }
            Ok(n) => {
                pending.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        }

        let (frames, rest) = protocol::split_frames(&pending);
        let frames: Vec<String> = frames.into_iter().map(str::to_string).collect();
        pending = rest.to_string();
        for frame in frames {
            dispatch(ctx, pool, peer, &frame).await;
        }
    }
}

/// Disables further reads from this connection until the dispatched task
/// completes, by simply not returning to `read_half.read(..)` until `await`
/// resolves: the worker-pool semaphore additionally bounds how many tasks
/// may run concurrently across all connections.
async fn dispatch(ctx: &AppContext, pool: &Arc<Semaphore>, peer: SocketAddr, frame: &str) {
    let request = match protocol::parse(frame) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%peer, error = %e, frame, "malformed frame, ignoring");
            return;
        }
    };

    let permit = match pool.clone().acquire_owned().await {
        Ok(p) => p,
        Err(_) => return,
    };

    let result = match request {
        Request::Login {
            nickname,
            password,
            udp_port,
        } => tasks::login::run(ctx, peer, &nickname, &password, udp_port).await,
        Request::Logout => tasks::logout::run(ctx, peer).await,
        Request::AddFriend { friend } => tasks::friend::add_friend(ctx, peer, &friend).await,
        Request::FriendList => tasks::friend::friend_list(ctx, peer).await,
        Request::Score => tasks::score::run(ctx, peer).await,
        Request::Scoreboard => tasks::scoreboard::run(ctx, peer).await,
        Request::Match { friend } => {
            let Some(challenger) = ctx.presence.nickname_of(peer) else {
                drop(permit);
                return;
            };
            tasks::match_task::run(ctx.clone(), peer, challenger, friend).await
        }
    };

    if let Err(e) = result {
        tracing::debug!(%peer, error = %e, "task returned an error (already reported to client)");
    }

    drop(permit);
}
