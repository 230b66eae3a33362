use std::collections::HashSet;

use axum::{
    Form, Json,
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::api::success;
use crate::error::FieldErrors;
use crate::polls::schema::FormFields;

pub const DEFAULT_QUORUM: i64 = 2;
pub const MIN_SLOTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPoll {
    pub title: String,
    pub description: String,
    pub quorum: i64,
    pub slots: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DraftResponse {
    poll: DraftPoll,
}

#[derive(Debug, Serialize)]
struct DraftErrors {
    ok: bool,
    errors: FieldErrors,
}

pub fn validate_draft(form: &FormFields) -> Result<DraftPoll, FieldErrors> {
    let mut errors = FieldErrors::new();

    let title = form.first("title").unwrap_or_default().trim().to_string();
    let description = form.first("description").unwrap_or_default().trim().to_string();

    let quorum_raw = form.first("quorum").unwrap_or_default();
    let quorum_raw = quorum_raw.trim();
    let quorum = if quorum_raw.is_empty() {
        Some(DEFAULT_QUORUM)
    } else {
        quorum_raw.parse::<i64>().ok()
    };

    let slots: Vec<String> = form
        .all("slots")
        .iter()
        .map(|slot| slot.trim().to_string())
        .filter(|slot| !slot.is_empty())
        .collect();

    if title.is_empty() {
        errors.insert("title", "Title is required.".to_string());
    }

    let quorum = match quorum {
        Some(q) if q >= DEFAULT_QUORUM => q,
        _ => {
            errors.insert("quorum", "Minimum people needed must be 2 or more.".to_string());
            DEFAULT_QUORUM
        }
    };

    if slots.len() < MIN_SLOTS {
        errors.insert("slots", "Add at least 2 options.".to_string());
    } else if slots.iter().collect::<HashSet<_>>().len() != slots.len() {
        errors.insert("slots", "Duplicate options aren't allowed.".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(DraftPoll {
        title,
        description,
        quorum,
        slots,
    })
}

pub async fn validate(form: Result<Form<Vec<(String, String)>>, FormRejection>) -> Response {
    let result = match form {
        Ok(Form(pairs)) => validate_draft(&FormFields::new(pairs)),
        Err(rejection) => Err(FieldErrors::from([("body", rejection.body_text())])),
    };

    match result {
        Ok(poll) => success(DraftResponse { poll }),
        Err(errors) => {
            tracing::info!(fields = ?errors.keys().collect::<Vec<_>>(), "draft poll rejected");
            (StatusCode::BAD_REQUEST, Json(DraftErrors { ok: false, errors })).into_response()
        }
    }
}
