//! The dispatchable task types. Each task receives the shared
//! [`crate::context::AppContext`] and the originating connection, and talks
//! back to the client exclusively through the Mailman's depot — except
//! [`match_task`], which is explicitly allowed to own the two ephemeral
//! match connections directly.

pub mod friend;
pub mod login;
pub mod logout;
pub mod match_task;
pub mod score;
pub mod scoreboard;
