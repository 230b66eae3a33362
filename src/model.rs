use serde::Serialize;

/// Only availability state a vote can carry today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
}

impl Availability {
    pub fn as_i64(&self) -> i64 {
        match self {
            Availability::Available => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: i64,
    pub token: String,
    pub title: String,
    pub description: Option<String>,
    pub timezone: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: i64,
    pub poll_id: i64,
    pub option_datetime: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    #[serde(flatten)]
    pub option: PollOption,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub poll: Poll,
    pub options: Vec<OptionTally>,
    pub participants: i64,
}

/// Returned by poll creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoll {
    pub token: String,
    pub poll_id: i64,
}

/// Everything a vote submission wrote, for the confirmation page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub token: String,
    pub poll_id: i64,
    pub participant_id: i64,
    pub edit_token: String,
    pub name: Option<String>,
    pub option_ids: Vec<i64>,
}
