//! The persistent user/friend/score database.
//!
//! In-memory state lives in a [`DashMap`] so individual record reads and
//! writes never contend with each other. Every mutating operation is
//! followed by a full-map snapshot to disk, serialised by `snapshot_lock` so
//! concurrent mutators never interleave writes to `Database.json`. The
//! snapshot itself is written to a sibling temp file and renamed over the
//! target, so a crash mid-write can never corrupt the last good snapshot.

use anyhow::Context;
use anyhow::Result;
use dashmap::DashMap;
use std::path::Path;
use std::path::PathBuf;
use tokio::sync::Mutex;
use wq_commons::PasswordHash;
use wq_commons::User;

const DATABASE_FILE_NAME: &str = "Database.json";

pub struct UserStore {
    users: DashMap<String, User>,
    path: PathBuf,
    snapshot_lock: Mutex<()>,
}

impl UserStore {
    /// Load `Database.json` from `data_dir`, or start empty if it doesn't
    /// exist yet.
    pub async fn load(data_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("creating data dir {}", data_dir.display()))?;

        let path = data_dir.join(DATABASE_FILE_NAME);
        let users = match tokio::fs::read_to_string(&path).await {
            Ok(data) => {
                let map: std::collections::BTreeMap<String, User> =
                    serde_json::from_str(&data).context("parsing Database.json")?;
                map.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no existing database, starting empty");
                DashMap::new()
            }
            Err(e) => return Err(e).context("reading Database.json"),
        };

        Ok(Self {
            users,
            path,
            snapshot_lock: Mutex::new(()),
        })
    }

    pub fn get(&self, nickname: &str) -> Option<User> {
        self.users.get(nickname).map(|r| r.clone())
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.users.contains_key(nickname)
    }

    /// Registers a new user. Returns `false` if the nickname is taken.
    pub async fn register(&self, nickname: &str, password: &str) -> Result<bool> {
        if self.users.contains_key(nickname) {
            return Ok(false);
        }
        self.users.insert(
            nickname.to_string(),
            User::new(nickname, PasswordHash::compute(password)),
        );
        self.snapshot().await?;
        Ok(true)
    }

    pub fn check_password(&self, nickname: &str, password: &str) -> Option<bool> {
        self.users.get(nickname).map(|u| u.pwd_hash.matches(password))
    }

    pub async fn set_score(&self, nickname: &str, delta: i64) -> Result<()> {
        if let Some(mut user) = self.users.get_mut(nickname) {
            user.score += delta;
        }
        self.snapshot().await
    }

    /// Adds a symmetric friendship. Returns `false` if they already are.
    pub async fn add_friend(&self, a: &str, b: &str) -> Result<bool> {
        let already = self
            .users
            .get(a)
            .map(|u| u.friends.iter().any(|f| f == b))
            .unwrap_or(false);
        if already {
            return Ok(false);
        }

        if let Some(mut user) = self.users.get_mut(a) {
            user.friends.push(b.to_string());
        }
        if let Some(mut user) = self.users.get_mut(b) {
            user.friends.push(a.to_string());
        }
        self.snapshot().await?;
        Ok(true)
    }

    async fn snapshot(&self) -> Result<()> {
        let _guard = self.snapshot_lock.lock().await;

        let all: std::collections::BTreeMap<String, User> = self
            .users
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let data = serde_json::to_vec_pretty(&all).context("serializing user database")?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data)
            .await
            .with_context(|| format!("writing {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("renaming snapshot into {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_rejects_duplicate_nickname() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load(dir.path()).await.unwrap();

        assert!(store.register("alice", "a").await.unwrap());
        assert!(!store.register("alice", "b").await.unwrap());
    }

    #[tokio::test]
    async fn password_check_reflects_registration() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load(dir.path()).await.unwrap();
        store.register("alice", "secret").await.unwrap();

        assert_eq!(store.check_password("alice", "secret"), Some(true));
        assert_eq!(store.check_password("alice", "wrong"), Some(false));
        assert_eq!(store.check_password("bob", "whatever"), None);
    }

    #[tokio::test]
    async fn add_friend_is_symmetric_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = UserStore::load(dir.path()).await.unwrap();
        store.register("alice", "a").await.unwrap();
        store.register("bob", "b").await.unwrap();

        assert!(store.add_friend("alice", "bob").await.unwrap());
        assert!(store.get("alice").unwrap().friends.contains(&"bob".to_string()));
        assert!(store.get("bob").unwrap().friends.contains(&"alice".to_string()));
        assert!(!store.add_friend("alice", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn snapshot_reloads_to_the_same_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = UserStore::load(dir.path()).await.unwrap();
            store.register("alice", "a").await.unwrap();
            store.set_score("alice", 5).await.unwrap();
        }

        let reloaded = UserStore::load(dir.path()).await.unwrap();
        assert_eq!(reloaded.get("alice").unwrap().score, 5);
    }
}
