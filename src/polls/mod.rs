//! Polls Module
//!
//! Scheduling polls: a creator posts a title, timezone and candidate
//! date/time options and gets back a short public token; respondents vote on
//! the options by token.
//!
//! # Usage
//!
//! ```rust,ignore
//! use huddle::polls;
//!
//! let app = Router::new()
//!     .merge(polls::routes())
//!     .with_state(app_state);
//!
//! let created = polls::Polls::new(&db).create_poll(&new_poll).await?;
//! ```

mod handler;
mod lib;
mod routes;
pub mod schema;

pub use lib::*;
pub use routes::routes;

/// Returns the migrations for the polls module.
pub fn migrations() -> &'static [(&'static str, &'static str)] {
    &[(
        "polls_001_schema.sql",
        include_str!("migrations/001_schema.sql"),
    )]
}
