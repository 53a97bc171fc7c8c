use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use std::net::SocketAddr;
use wq_commons::ProtocolError;

pub async fn add_friend(
    ctx: &AppContext,
    connection: SocketAddr,
    friend: &str,
) -> Result<(), TaskError> {
    let result = add(ctx, connection, friend).await;

    let body = match &result {
        Ok(()) => format!("{friend} is now your friend.\n"),
        Err(e) => format!("{}\n", e.wire_message()),
    };

    send(ctx, connection, body).await?;
    result
}

async fn add(ctx: &AppContext, connection: SocketAddr, friend: &str) -> Result<(), TaskError> {
    let nickname = ctx
        .presence
        .nickname_of(connection)
        .ok_or(ProtocolError::NotLoggedIn)?;

    if nickname == friend {
        return Err(ProtocolError::SelfFriend.into());
    }
    if !ctx.store.contains(friend) {
        return Err(ProtocolError::FriendNotRegistered(friend.to_string()).into());
    }

    let added = ctx.store.add_friend(&nickname, friend).await?;
    if !added {
        return Err(ProtocolError::AlreadyFriends(friend.to_string()).into());
    }
    Ok(())
}

pub async fn friend_list(ctx: &AppContext, connection: SocketAddr) -> Result<(), TaskError> {
    let nickname = ctx
        .presence
        .nickname_of(connection)
        .ok_or(ProtocolError::NotLoggedIn)?;

    let user = ctx
        .store
        .get(&nickname)
        .ok_or(ProtocolError::NotLoggedIn)?;

    let body = if user.friends.is_empty() {
        "You currently have no friends, add some!\n".to_string()
    } else {
        format!("Your friends are: {}\n", user.friends.join(" "))
    };

    send(ctx, connection, body).await?;
    Ok(())
}

async fn send(ctx: &AppContext, connection: SocketAddr, body: String) -> Result<(), TaskError> {
    ctx.depot
        .send(Mail {
            destination: connection,
            body,
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;
    Ok(())
}
