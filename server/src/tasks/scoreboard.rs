use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use std::net::SocketAddr;
use wq_commons::ProtocolError;
use wq_commons::User;

pub async fn run(ctx: &AppContext, connection: SocketAddr) -> Result<(), TaskError> {
    let nickname = ctx
        .presence
        .nickname_of(connection)
        .ok_or(ProtocolError::NotLoggedIn)?;
    let user = ctx
        .store
        .get(&nickname)
        .ok_or(ProtocolError::NotLoggedIn)?;

    let mut board = vec![user.clone()];
    for friend in &user.friends {
        if let Some(friend_user) = ctx.store.get(friend) {
            board.push(friend_user);
        }
    }

    let body = format!("{}\n", render(&board));
    ctx.depot
        .send(Mail {
            destination: connection,
            body,
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;
    Ok(())
}

/// Sorts by descending score, ties broken by the caller's original order,
/// and renders "`<nick> <score>`" pairs separated by single spaces.
///
/// The literal scenario in the spec shows a dangling trailing space before
/// the newline; normalised away here for the same reason as the empty
/// friend-list response (no dangling whitespace in any wire response).
fn render(board: &[User]) -> String {
    let mut sorted: Vec<&User> = board.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    sorted
        .into_iter()
        .map(|u| format!("{} {}", u.nickname, u.score))
        .collect::<Vec<_>>()
        .join(" ")
}
