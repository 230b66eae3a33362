//! Draft poll validation
//!
//! A stateless endpoint that checks a proposed poll (title, quorum and at
//! least two distinct slots) and echoes it back. Nothing is stored; the
//! vocabulary (`quorum`, `slots`) is its own and does not map onto the
//! `polls` module's `options`.

mod handler;
mod routes;

pub use handler::{DraftPoll, validate_draft};
pub use routes::routes;
