use axum::{Router, routing::get};

use crate::handler::{AppState, healthcheck};

pub mod api;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod handler;
pub mod model;
pub mod polls;
pub mod token;

/// Every route the service answers, bound to `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(healthcheck))
        .merge(polls::routes())
        .nest("/api/polls", draft::routes())
        .with_state(state)
}
