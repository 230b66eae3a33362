//! HTTP handlers for poll actions

use axum::{
    Form, Json,
    extract::{FromRequest, Path, Request, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use super::Polls;
use super::schema::{CreatePollInput, FormFields, SubmitVoteInput};
use crate::api::success;
use crate::error::PollError;
use crate::handler::AppState;
use crate::model::{CreatedPoll, PollSummary, VoteReceipt};

#[derive(Debug, Serialize)]
struct VoteResponse {
    vote: VoteReceipt,
}

pub async fn create_poll(State(state): State<AppState>, request: Request) -> Response {
    respond("create poll", create_poll_inner(&state, request).await)
}

pub async fn submit_vote(State(state): State<AppState>, request: Request) -> Response {
    let result = submit_vote_inner(&state, request)
        .await
        .map(|vote| VoteResponse { vote });
    respond("submit vote", result)
}

pub async fn get_poll(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    respond("get poll", get_poll_inner(&state, &token).await)
}

async fn create_poll_inner(state: &AppState, request: Request) -> Result<CreatedPoll, PollError> {
    let db = state.database()?;
    let input: CreatePollInput = read_input(state, request).await?;
    tracing::debug!(?input, "create poll input");

    let poll = input.validate()?;
    Polls::new(db).create_poll(&poll).await
}

async fn submit_vote_inner(state: &AppState, request: Request) -> Result<VoteReceipt, PollError> {
    let db = state.database()?;
    let input: SubmitVoteInput = read_input(state, request).await?;
    tracing::debug!(?input, "submit vote input");

    let vote = input.validate()?;
    Polls::new(db).submit_vote(&vote).await
}

async fn get_poll_inner(state: &AppState, token: &str) -> Result<PollSummary, PollError> {
    let db = state.database()?;
    Polls::new(db)
        .get_poll(token)
        .await?
        .ok_or_else(|| PollError::NotFound("Unknown poll token.".to_string()))
}

/// Reads a JSON body when the request says so, a urlencoded form otherwise.
async fn read_input<T>(state: &AppState, request: Request) -> Result<T, PollError>
where
    T: DeserializeOwned + From<FormFields>,
{
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        let Json(input) = Json::<T>::from_request(request, state)
            .await
            .map_err(|e| PollError::invalid("body", e.body_text()))?;
        Ok(input)
    } else {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
            .await
            .map_err(|e| PollError::invalid("body", e.body_text()))?;
        Ok(T::from(FormFields::new(pairs)))
    }
}

fn respond<T: Serialize>(action: &str, result: Result<T, PollError>) -> Response {
    match result {
        Ok(data) => success(data),
        Err(e) => {
            match &e {
                PollError::Validation(_) | PollError::NotFound(_) => {
                    tracing::info!(action, kind = e.kind(), error = %e, "request rejected")
                }
                _ => tracing::error!(action, kind = e.kind(), error = %e, "request failed"),
            }
            e.into_response()
        }
    }
}
