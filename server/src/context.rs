//! The server's process-wide shared state, handed to every task by value
//! instead of reaching for a singleton.

use crate::mail::DepotSender;
use crate::mail::MailRegistry;
use crate::presence::Presence;
use crate::store::UserStore;
use crate::translator::Translator;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<UserStore>,
    pub presence: Arc<Presence>,
    pub depot: DepotSender,
    pub registry: MailRegistry,
    pub translator: Translator,
    pub num_words: usize,
    pub match_duration: Duration,
    pub invitation_duration: Duration,
}
