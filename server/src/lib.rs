pub mod cli;
pub mod context;
pub mod error;
pub mod logger;
pub mod mail;
pub mod presence;
pub mod protocol;
pub mod reactor;
pub mod registration;
pub mod store;
pub mod tasks;
pub mod translator;
pub mod udp_discovery;

use crate::cli::Config;
use crate::context::AppContext;
use crate::mail::MailRegistry;
use crate::presence::Presence;
use crate::store::UserStore;
use crate::translator::Translator;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Wires up the shared context and runs the reactor, UDP discovery
/// responder and registration endpoint until one of them fails.
pub async fn run(config: Config) -> Result<()> {
    let store = Arc::new(UserStore::load(&config.data_dir).await?);
    let presence = Arc::new(Presence::new());
    let registry = MailRegistry::new();
    let (depot, depot_rx) = mail::depot_channel();
    let translator = Translator::new(config.translator_url.clone());

    mail::spawn_mailman(depot_rx, registry.clone());

    let ctx = AppContext {
        store: store.clone(),
        presence,
        depot,
        registry,
        translator,
        num_words: config.num_words,
        match_duration: Duration::from_secs(config.match_minutes * 60),
        invitation_duration: Duration::from_secs(config.invitation_seconds),
    };

    let reactor = tokio::spawn(reactor::run(ctx.clone(), config.tcp_port, config.worker_threads));
    let discovery = tokio::spawn(udp_discovery::run(config.udp_port, config.tcp_port));
    let registration = tokio::spawn(registration::serve(store));

    tokio::select! {
        res = reactor => res??,
        res = discovery => res??,
        res = registration => res??,
    }

    Ok(())
}
