use std::sync::Arc;

use axum::response::Response;
use tracing::info;

use crate::api::{Status, success};
use crate::db::Database;
use crate::error::PollError;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no database is configured; poll actions then answer with a
    /// configuration error.
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn database(&self) -> Result<&Database, PollError> {
        self.db.as_deref().ok_or(PollError::Configuration)
    }
}

pub async fn healthcheck() -> Response {
    info!("got healthcheck request");
    success(Status { status: "ok" })
}
