use crate::context::AppContext;
use crate::error::TaskError;
use crate::mail::Mail;
use std::net::SocketAddr;
use wq_commons::ProtocolError;

pub async fn run(ctx: &AppContext, connection: SocketAddr) -> Result<(), TaskError> {
    let nickname = ctx
        .presence
        .nickname_of(connection)
        .ok_or(ProtocolError::NotLoggedIn)?;
    let user = ctx
        .store
        .get(&nickname)
        .ok_or(ProtocolError::NotLoggedIn)?;

    let body = format!("{}, your score is: {}\n", user.nickname, user.score);
    ctx.depot
        .send(Mail {
            destination: connection,
            body,
        })
        .await
        .map_err(|_| anyhow::anyhow!("depot closed"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::depot_channel;
    use crate::mail::MailRegistry;
    use crate::presence::Presence;
    use crate::store::UserStore;
    use crate::translator::Translator;
    use std::time::Duration;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[tokio::test]
    async fn reports_current_score() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load(dir.path()).await.unwrap();
        store.register("alice", "a").await.unwrap();
        store.set_score("alice", 7).await.unwrap();
        let (depot, mut rx) = depot_channel();
        let presence = Presence::new();
        presence.login(addr(1), "alice", addr(2)).unwrap();

        let ctx = AppContext {
            store: std::sync::Arc::new(store),
            presence: std::sync::Arc::new(presence),
            depot,
            registry: MailRegistry::new(),
            translator: Translator::new("http://localhost".to_string()),
            num_words: 5,
            match_duration: Duration::from_secs(60),
            invitation_duration: Duration::from_secs(10),
        };

        run(&ctx, addr(1)).await.unwrap();
        let mail = rx.recv().await.unwrap();
        assert_eq!(mail.body, "alice, your score is: 7\n");
    }
}
