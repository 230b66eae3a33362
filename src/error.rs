use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::{ErrorBody, failure};

/// Field name to user-facing message.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Database is not available. Set app.database in the config file.")]
    Configuration,
    #[error("{}", join_field_errors(.0))]
    Validation(FieldErrors),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    WriteFailed(String),
    #[error("{0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl PollError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        PollError::Validation(BTreeMap::from([(field, message.into())]))
    }

    pub fn kind(&self) -> &'static str {
        use PollError::*;
        match self {
            Configuration => "configuration",
            Validation(_) => "validation",
            NotFound(_) => "not_found",
            WriteFailed(_) => "write_failed",
            Unexpected(_) => "unexpected",
        }
    }

    pub fn status(&self) -> StatusCode {
        use PollError::*;
        match self {
            Configuration => StatusCode::SERVICE_UNAVAILABLE,
            Validation(_) => StatusCode::BAD_REQUEST,
            NotFound(_) => StatusCode::NOT_FOUND,
            WriteFailed(_) | Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for PollError {
    fn from(error: libsql::Error) -> Self {
        PollError::Unexpected(error.into())
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let kind = self.kind();
        let fields = match self {
            PollError::Validation(fields) => Some(fields),
            _ => None,
        };
        failure(status, ErrorBody { kind, message, fields })
    }
}

fn join_field_errors(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let mut fields = FieldErrors::new();
        fields.insert("title", "Poll title is required.".to_string());
        fields.insert("options", "Add at least one time option.".to_string());
        let err = PollError::Validation(fields);

        assert_eq!(err.kind(), "validation");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "options: Add at least one time option.; title: Poll title is required."
        );
    }

    #[test]
    fn test_unexpected_keeps_source_chain() {
        let inner = anyhow::anyhow!("disk I/O error").context("insert into polls");
        let err = PollError::from(inner);
        assert_eq!(err.kind(), "unexpected");
        assert_eq!(err.to_string(), "insert into polls: disk I/O error");
    }

    #[test]
    fn test_kinds_and_statuses() {
        assert_eq!(PollError::Configuration.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(PollError::NotFound("Unknown poll token.".into()).kind(), "not_found");
        assert_eq!(
            PollError::WriteFailed("Failed to create poll".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
