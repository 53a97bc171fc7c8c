//! The registration RPC endpoint: a single `POST /register` call exposed
//! on its own well-known port, returning one of exactly four contractual
//! response strings.

use crate::store::UserStore;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

pub const REGISTRATION_PORT: u16 = 5678;

const MAX_FIELD_LEN: usize = 64;

#[derive(Clone)]
struct AppState {
    store: Arc<UserStore>,
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    password: String,
}

pub fn router(store: Arc<UserStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/register", post(register))
        .with_state(state)
}

pub async fn serve(store: Arc<UserStore>) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], REGISTRATION_PORT));
    tracing::info!(%addr, "registration endpoint listening");
    axum::Server::bind(&addr)
        .serve(router(store).into_make_service())
        .await?;
    Ok(())
}

fn is_valid_field(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_FIELD_LEN
        && value.chars().all(|c| c.is_ascii_graphic())
}

async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> String {
    if !is_valid_field(&req.username) {
        return "Invalid username.".to_string();
    }
    if !is_valid_field(&req.password) {
        return "Invalid password.".to_string();
    }

    match state.store.register(&req.username, &req.password).await {
        Ok(true) => "Registration succeeded.".to_string(),
        Ok(false) => "Nickname already taken.".to_string(),
        Err(e) => {
            tracing::error!(error = %e, "registration persistence failed");
            "Invalid username.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_whitespace_and_empty_fields() {
        assert!(!is_valid_field(""));
        assert!(!is_valid_field("has space"));
        assert!(is_valid_field("alice"));
    }

    #[test]
    fn rejects_overlong_fields() {
        let long = "a".repeat(MAX_FIELD_LEN + 1);
        assert!(!is_valid_field(&long));
    }
}
