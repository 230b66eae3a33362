//! Input schemas for poll creation and vote submission.
//!
//! Raw input arrives either as a urlencoded form (repeated keys for
//! multi-valued fields) or as JSON. Both are funnelled into the `*Input`
//! structs below, whose `validate` methods produce the typed records the
//! database layer consumes.

use serde::Deserialize;

use crate::error::{FieldErrors, PollError};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// Key/value pairs of a urlencoded body, in submission order.
#[derive(Debug, Default, Clone)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn first(&self, key: &str) -> Option<String> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    pub fn all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

// ============================================================================
// Options
// ============================================================================

/// The shapes the `options` field shows up in.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawOptions {
    #[default]
    Absent,
    Many(Vec<Option<String>>),
    Single(String),
}

impl RawOptions {
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => RawOptions::Absent,
            1 => RawOptions::Single(values.remove(0)),
            _ => RawOptions::Many(values.into_iter().map(Some).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOptions {
    Parsed(Vec<String>),
    /// Looked like a JSON array but did not parse; kept as one option.
    Fallback(String),
}

impl ParsedOptions {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ParsedOptions::Parsed(values) => values,
            ParsedOptions::Fallback(value) => vec![value],
        }
    }
}

pub fn parse_options(raw: RawOptions) -> ParsedOptions {
    match raw {
        RawOptions::Absent => ParsedOptions::Parsed(vec![]),
        RawOptions::Many(values) => ParsedOptions::Parsed(values.into_iter().flatten().collect()),
        RawOptions::Single(value) => {
            if !value.trim_start().starts_with('[') {
                return ParsedOptions::Parsed(vec![value]);
            }
            match serde_json::from_str::<Vec<Option<String>>>(&value) {
                Ok(values) => ParsedOptions::Parsed(values.into_iter().flatten().collect()),
                Err(e) => {
                    tracing::debug!(error = %e, "options look like JSON but did not parse, using raw value");
                    ParsedOptions::Fallback(value)
                }
            }
        }
    }
}

/// Parses, trims and drops blank entries, keeping input order.
pub fn clean_options(raw: RawOptions) -> Vec<String> {
    parse_options(raw)
        .into_vec()
        .into_iter()
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect()
}

// ============================================================================
// Poll creation
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreatePollInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub options: RawOptions,
}

impl From<FormFields> for CreatePollInput {
    fn from(form: FormFields) -> Self {
        CreatePollInput {
            title: form.first("title"),
            description: form.first("description"),
            timezone: form.first("timezone"),
            options: RawOptions::from_values(form.all("options")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub timezone: String,
    pub options: Vec<String>,
}

impl CreatePollInput {
    pub fn validate(self) -> Result<NewPoll, PollError> {
        let mut errors = FieldErrors::new();

        let title = trimmed(self.title);
        if title.is_empty() {
            errors.insert("title", "Poll title is required.".to_string());
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.insert(
                "title",
                format!("Poll title must be at most {TITLE_MAX_CHARS} characters."),
            );
        }

        let description = Some(trimmed(self.description)).filter(|d| !d.is_empty());
        if let Some(d) = &description {
            if d.chars().count() > DESCRIPTION_MAX_CHARS {
                errors.insert(
                    "description",
                    format!("Description must be at most {DESCRIPTION_MAX_CHARS} characters."),
                );
            }
        }

        let timezone = trimmed(self.timezone);
        if timezone.is_empty() {
            errors.insert("timezone", "Timezone is required.".to_string());
        }

        let options = clean_options(self.options);
        if options.is_empty() {
            errors.insert("options", "Add at least one time option.".to_string());
        }

        if !errors.is_empty() {
            return Err(PollError::Validation(errors));
        }

        Ok(NewPoll {
            title,
            description,
            timezone,
            options,
        })
    }
}

// ============================================================================
// Vote submission
// ============================================================================

/// An option id as submitted: JSON number or text to be coerced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawOptionIds {
    #[default]
    Absent,
    Many(Vec<Option<RawId>>),
    Single(RawId),
}

impl RawOptionIds {
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => RawOptionIds::Absent,
            1 => RawOptionIds::Single(RawId::Text(values.remove(0))),
            _ => RawOptionIds::Many(values.into_iter().map(|v| Some(RawId::Text(v))).collect()),
        }
    }
}

/// Flattens the submitted ids into integers. Blank entries are skipped.
pub fn normalize_option_ids(raw: RawOptionIds) -> Result<Vec<i64>, String> {
    let ids = match raw {
        RawOptionIds::Absent => vec![],
        RawOptionIds::Single(id) => vec![id],
        RawOptionIds::Many(ids) => ids.into_iter().flatten().collect(),
    };

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        match id {
            RawId::Number(n) => out.push(n),
            RawId::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    continue;
                }
                let n = s
                    .parse::<i64>()
                    .map_err(|_| "Option ids must be integers.".to_string())?;
                out.push(n);
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteInput {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub option_ids: RawOptionIds,
}

impl From<FormFields> for SubmitVoteInput {
    fn from(form: FormFields) -> Self {
        SubmitVoteInput {
            token: form.first("token"),
            name: form.first("name"),
            option_ids: RawOptionIds::from_values(form.all("optionIds")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVote {
    pub token: String,
    pub name: Option<String>,
    pub option_ids: Vec<i64>,
}

impl SubmitVoteInput {
    pub fn validate(self) -> Result<NewVote, PollError> {
        let mut errors = FieldErrors::new();

        let token = trimmed(self.token);
        if token.is_empty() {
            errors.insert("token", "Poll token is required.".to_string());
        }

        let name = Some(trimmed(self.name)).filter(|n| !n.is_empty());

        let option_ids = match normalize_option_ids(self.option_ids) {
            Ok(ids) if ids.is_empty() => {
                errors.insert("optionIds", "Pick at least one time option.".to_string());
                ids
            }
            Ok(ids) => ids,
            Err(message) => {
                errors.insert("optionIds", message);
                vec![]
            }
        };

        if !errors.is_empty() {
            return Err(PollError::Validation(errors));
        }

        Ok(NewVote {
            token,
            name,
            option_ids,
        })
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn field_errors(err: PollError) -> FieldErrors {
        match err {
            PollError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_option_shapes_normalize_alike() {
        let expected = strings(&["2024-01-01T10:00", "2024-01-02T14:00"]);

        let native = RawOptions::Many(vec![
            Some("2024-01-01T10:00".into()),
            Some(" 2024-01-02T14:00 ".into()),
        ]);
        let json = RawOptions::Single(r#"["2024-01-01T10:00", "2024-01-02T14:00"]"#.into());
        let repeated = RawOptions::from_values(strings(&["2024-01-01T10:00", "2024-01-02T14:00"]));

        assert_eq!(clean_options(native), expected);
        assert_eq!(clean_options(json), expected);
        assert_eq!(clean_options(repeated), expected);

        assert_eq!(
            clean_options(RawOptions::Single(" 2024-01-01T10:00 ".into())),
            strings(&["2024-01-01T10:00"])
        );
        assert!(clean_options(RawOptions::Absent).is_empty());
    }

    #[test]
    fn test_blank_and_null_options_are_dropped() {
        let raw = RawOptions::Many(vec![
            Some("".into()),
            None,
            Some("2024-01-01T10:00".into()),
            Some("   ".into()),
        ]);
        assert_eq!(clean_options(raw), strings(&["2024-01-01T10:00"]));

        let json = RawOptions::Single(r#"["", null, "  "]"#.into());
        assert!(clean_options(json).is_empty());
    }

    #[test]
    fn test_unparseable_json_falls_back_to_single_option() {
        let raw = RawOptions::Single("[2024-01-01T10:00".into());
        assert_eq!(
            parse_options(raw),
            ParsedOptions::Fallback("[2024-01-01T10:00".into())
        );

        let numbers = RawOptions::Single("[1, 2]".into());
        assert_eq!(clean_options(numbers), strings(&["[1, 2]"]));
    }

    #[test]
    fn test_options_deserialize_from_json_shapes() {
        let input: CreatePollInput =
            serde_json::from_str(r#"{"title": "a", "options": ["x", null]}"#).unwrap();
        assert_eq!(input.options, RawOptions::Many(vec![Some("x".into()), None]));

        let input: CreatePollInput = serde_json::from_str(r#"{"options": "x"}"#).unwrap();
        assert_eq!(input.options, RawOptions::Single("x".into()));

        let input: CreatePollInput = serde_json::from_str(r#"{"options": null}"#).unwrap();
        assert_eq!(input.options, RawOptions::Absent);

        let input: CreatePollInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.options, RawOptions::Absent);
    }

    #[test]
    fn test_valid_poll() {
        let input = CreatePollInput {
            title: Some("  Team Sync ".into()),
            description: Some("   ".into()),
            timezone: Some("UTC".into()),
            options: RawOptions::Many(vec![
                Some("2024-01-01T10:00".into()),
                Some("2024-01-02T14:00".into()),
            ]),
        };

        let poll = input.validate().unwrap();
        assert_eq!(poll.title, "Team Sync");
        assert_eq!(poll.description, None);
        assert_eq!(poll.timezone, "UTC");
        assert_eq!(poll.options.len(), 2);
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let input = CreatePollInput {
            title: Some("".into()),
            timezone: Some("UTC".into()),
            options: RawOptions::Single("2024-01-01T10:00".into()),
            ..Default::default()
        };

        let fields = field_errors(input.validate().unwrap_err());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["title"], "Poll title is required.");
    }

    #[test]
    fn test_length_limits_count_characters() {
        let input = CreatePollInput {
            title: Some("é".repeat(TITLE_MAX_CHARS)),
            description: Some("ü".repeat(DESCRIPTION_MAX_CHARS)),
            timezone: Some("Europe/Berlin".into()),
            options: RawOptions::Single("2024-01-01T10:00".into()),
        };
        assert!(input.validate().is_ok());

        let input = CreatePollInput {
            title: Some("a".repeat(TITLE_MAX_CHARS + 1)),
            description: Some("b".repeat(DESCRIPTION_MAX_CHARS + 1)),
            timezone: Some("UTC".into()),
            options: RawOptions::Single("2024-01-01T10:00".into()),
        };
        let fields = field_errors(input.validate().unwrap_err());
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));
    }

    #[test]
    fn test_missing_everything_reports_every_field() {
        let fields = field_errors(CreatePollInput::default().validate().unwrap_err());
        assert_eq!(
            fields.keys().copied().collect::<Vec<_>>(),
            vec!["options", "timezone", "title"]
        );
        assert_eq!(fields["options"], "Add at least one time option.");
    }

    #[test]
    fn test_poll_from_form_fields() {
        let form = FormFields::new(vec![
            ("title".into(), "Standup".into()),
            ("timezone".into(), "UTC".into()),
            ("options".into(), "2024-01-01T09:00".into()),
            ("options".into(), "".into()),
            ("options".into(), "2024-01-01T10:00".into()),
        ]);
        let poll = CreatePollInput::from(form).validate().unwrap();
        assert_eq!(poll.options, strings(&["2024-01-01T09:00", "2024-01-01T10:00"]));
    }

    #[test]
    fn test_option_ids_single_many_absent() {
        assert_eq!(
            normalize_option_ids(RawOptionIds::Single(RawId::Text("5".into()))),
            Ok(vec![5])
        );
        assert_eq!(
            normalize_option_ids(RawOptionIds::from_values(strings(&["5", "7", " 9 "]))),
            Ok(vec![5, 7, 9])
        );
        assert_eq!(
            normalize_option_ids(RawOptionIds::Many(vec![Some(RawId::Number(3)), None])),
            Ok(vec![3])
        );
        assert_eq!(normalize_option_ids(RawOptionIds::Absent), Ok(vec![]));
        assert!(normalize_option_ids(RawOptionIds::Single(RawId::Text("five".into()))).is_err());
    }

    #[test]
    fn test_vote_validation() {
        let input: SubmitVoteInput =
            serde_json::from_str(r#"{"token": " abc ", "name": "  ", "optionIds": [5, "7"]}"#)
                .unwrap();
        let vote = input.validate().unwrap();
        assert_eq!(vote.token, "abc");
        assert_eq!(vote.name, None);
        assert_eq!(vote.option_ids, vec![5, 7]);

        let input = SubmitVoteInput {
            token: Some("abc".into()),
            name: Some("Ada".into()),
            option_ids: RawOptionIds::Absent,
        };
        let fields = field_errors(input.validate().unwrap_err());
        assert_eq!(fields["optionIds"], "Pick at least one time option.");

        let fields = field_errors(SubmitVoteInput::default().validate().unwrap_err());
        assert!(fields.contains_key("token"));
        assert!(fields.contains_key("optionIds"));
    }

    #[test]
    fn test_vote_from_form_fields() {
        let form = FormFields::new(vec![
            ("token".into(), "abc".into()),
            ("name".into(), " Grace ".into()),
            ("optionIds".into(), "12".into()),
        ]);
        let vote = SubmitVoteInput::from(form).validate().unwrap();
        assert_eq!(vote.name.as_deref(), Some("Grace"));
        assert_eq!(vote.option_ids, vec![12]);
    }
}
