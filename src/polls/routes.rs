use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/actions/createPoll", post(handler::create_poll))
        .route("/actions/submitVote", post(handler::submit_vote))
        .route("/polls/:token", get(handler::get_poll))
}
