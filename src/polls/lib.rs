use std::collections::HashSet;
use std::future::Future;

use libsql::Row;

use super::schema::{NewPoll, NewVote};
use crate::db::Database;
use crate::error::PollError;
use crate::model::{Availability, CreatedPoll, OptionTally, Poll, PollOption, PollSummary, VoteReceipt};
use crate::token::{DEFAULT_TOKEN_LENGTH, generate_edit_token, generate_token};

/// How many fresh tokens poll creation tries before giving up on a unique one.
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

pub struct Polls<'a> {
    db: &'a Database,
}

impl<'a> Polls<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Runs `work` inside a transaction on the shared connection, committing
    /// only if it succeeds. Dropping the returned future rolls the work back.
    async fn in_transaction<T>(
        &self,
        work: impl Future<Output = Result<T, PollError>>,
    ) -> Result<T, PollError> {
        let _guard = self.db.lock().await?;
        let tx = self.db.connection().transaction().await?;

        match work.await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Poll creation
    // ========================================================================

    pub async fn create_poll(&self, poll: &NewPoll) -> Result<CreatedPoll, PollError> {
        self.create_poll_with(poll, || generate_token(DEFAULT_TOKEN_LENGTH))
            .await
    }

    /// Same as [`Polls::create_poll`], drawing candidate tokens from `next_token`.
    pub async fn create_poll_with(
        &self,
        poll: &NewPoll,
        mut next_token: impl FnMut() -> String,
    ) -> Result<CreatedPoll, PollError> {
        if poll.options.is_empty() {
            return Err(PollError::invalid("options", "Add at least one time option."));
        }

        let created = self
            .in_transaction(self.create_poll_internal(poll, &mut next_token))
            .await?;

        tracing::info!(
            poll_id = created.poll_id,
            token = %created.token,
            options = poll.options.len(),
            "poll created"
        );
        Ok(created)
    }

    async fn create_poll_internal(
        &self,
        poll: &NewPoll,
        next_token: &mut impl FnMut() -> String,
    ) -> Result<CreatedPoll, PollError> {
        let (poll_id, token) = self.insert_poll(poll, next_token).await?;

        let insert_option = "INSERT INTO poll_options (poll_id, option_datetime) VALUES (?, ?)";
        for option in &poll.options {
            self.db
                .connection()
                .execute(insert_option, libsql::params![poll_id, option.as_str()])
                .await?;
        }

        Ok(CreatedPoll { token, poll_id })
    }

    async fn insert_poll(
        &self,
        poll: &NewPoll,
        next_token: &mut impl FnMut() -> String,
    ) -> Result<(i64, String), PollError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = next_token();
            match self.insert_poll_row(poll, &token).await {
                Ok(Some(poll_id)) => return Ok((poll_id, token)),
                Ok(None) => return Err(PollError::WriteFailed("Failed to create poll".to_string())),
                Err(e) if is_unique_violation(&e) => {
                    tracing::warn!(attempt, "poll token already taken, generating another");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PollError::WriteFailed(format!(
            "Failed to create poll: no unique token after {MAX_TOKEN_ATTEMPTS} attempts"
        )))
    }

    async fn insert_poll_row(&self, poll: &NewPoll, token: &str) -> libsql::Result<Option<i64>> {
        let query = r#"
            INSERT INTO polls (token, title, description, timezone)
            VALUES (?, ?, ?, ?)
            RETURNING id
        "#;

        let mut rows = self
            .db
            .connection()
            .query(
                query,
                libsql::params![
                    token,
                    poll.title.as_str(),
                    poll.description.as_deref(),
                    poll.timezone.as_str()
                ],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Vote submission
    // ========================================================================

    pub async fn submit_vote(&self, vote: &NewVote) -> Result<VoteReceipt, PollError> {
        if vote.option_ids.is_empty() {
            return Err(PollError::invalid("optionIds", "Pick at least one time option."));
        }

        let receipt = self.in_transaction(self.submit_vote_internal(vote)).await?;

        tracing::info!(
            poll_id = receipt.poll_id,
            participant_id = receipt.participant_id,
            votes = receipt.option_ids.len(),
            "vote recorded"
        );
        Ok(receipt)
    }

    async fn submit_vote_internal(&self, vote: &NewVote) -> Result<VoteReceipt, PollError> {
        let poll_id = self
            .find_poll_id(&vote.token)
            .await?
            .ok_or_else(|| PollError::NotFound("Unknown poll token.".to_string()))?;

        let known = self.option_ids(poll_id).await?;
        if let Some(stray) = vote.option_ids.iter().find(|id| !known.contains(*id)) {
            return Err(PollError::invalid(
                "optionIds",
                format!("Option {stray} does not belong to this poll."),
            ));
        }

        let edit_token = generate_edit_token();
        let participant_id = self
            .insert_participant(poll_id, vote.name.as_deref(), &edit_token)
            .await?
            .ok_or_else(|| PollError::WriteFailed("Failed to create participant".to_string()))?;

        let insert_vote = "INSERT INTO votes (participant_id, option_id, availability) VALUES (?, ?, ?)";
        for option_id in &vote.option_ids {
            self.db
                .connection()
                .execute(
                    insert_vote,
                    libsql::params![participant_id, *option_id, Availability::Available.as_i64()],
                )
                .await?;
        }

        Ok(VoteReceipt {
            token: vote.token.clone(),
            poll_id,
            participant_id,
            edit_token,
            name: vote.name.clone(),
            option_ids: vote.option_ids.clone(),
        })
    }

    async fn insert_participant(
        &self,
        poll_id: i64,
        name: Option<&str>,
        edit_token: &str,
    ) -> libsql::Result<Option<i64>> {
        let query = r#"
            INSERT INTO participants (poll_id, name, edit_token)
            VALUES (?, ?, ?)
            RETURNING id
        "#;

        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![poll_id, name, edit_token])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    async fn find_poll_id(&self, token: &str) -> libsql::Result<Option<i64>> {
        let query = "SELECT id FROM polls WHERE token = ?";
        let mut rows = self.db.connection().query(query, libsql::params![token]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn option_ids(&self, poll_id: i64) -> libsql::Result<HashSet<i64>> {
        let query = "SELECT id FROM poll_options WHERE poll_id = ?";
        let mut rows = self.db.connection().query(query, libsql::params![poll_id]).await?;

        let mut ids = HashSet::new();
        while let Some(row) = rows.next().await? {
            ids.insert(row.get::<i64>(0)?);
        }
        Ok(ids)
    }

    pub async fn get_poll(&self, token: &str) -> Result<Option<PollSummary>, PollError> {
        let _guard = self.db.lock().await?;

        let query = r#"
            SELECT id, token, title, description, timezone, created_at
            FROM polls WHERE token = ?
        "#;

        let conn = self.db.connection();
        let mut rows = conn.query(query, libsql::params![token]).await?;
        let poll = match rows.next().await? {
            Some(row) => row_to_poll(&row)?,
            None => return Ok(None),
        };

        let tally_query = r#"
            SELECT poll_options.id, poll_options.poll_id, poll_options.option_datetime,
                   COUNT(votes.id) AS votes
            FROM poll_options
            LEFT JOIN votes ON votes.option_id = poll_options.id
            WHERE poll_options.poll_id = ?
            GROUP BY poll_options.id, poll_options.poll_id, poll_options.option_datetime
            ORDER BY poll_options.id
        "#;

        let mut rows = conn.query(tally_query, libsql::params![poll.id]).await?;
        let mut options = Vec::new();
        while let Some(row) = rows.next().await? {
            options.push(OptionTally {
                option: PollOption {
                    id: row.get(0)?,
                    poll_id: row.get(1)?,
                    option_datetime: row.get(2)?,
                },
                votes: row.get(3)?,
            });
        }

        let count_query = "SELECT COUNT(*) FROM participants WHERE poll_id = ?";
        let mut rows = conn.query(count_query, libsql::params![poll.id]).await?;
        let participants: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        Ok(Some(PollSummary {
            poll,
            options,
            participants,
        }))
    }
}

fn row_to_poll(row: &Row) -> libsql::Result<Poll> {
    Ok(Poll {
        id: row.get(0)?,
        token: row.get(1)?,
        title: row.get(2)?,
        description: row.get::<Option<String>>(3)?,
        timezone: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extended result code SQLite reports for a violated `UNIQUE` constraint.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

fn is_unique_violation(err: &libsql::Error) -> bool {
    match err {
        libsql::Error::SqliteFailure(code, _) => *code == SQLITE_CONSTRAINT_UNIQUE,
        libsql::Error::RemoteSqliteFailure(_, extended, _) => *extended == SQLITE_CONSTRAINT_UNIQUE,
        _ => false,
    }
}
