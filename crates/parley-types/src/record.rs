//! Persisted session record.
//!
//! The record is the JSON shape a conversation is saved in. Token counts are
//! derived data and never appear here; they are recomputed from `model` and
//! each turn's content when the record is loaded.
//!
//! Parsing goes through [`SessionRecord::from_value`] rather than a serde
//! derive so that every rejection names the offending field path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::budget::{BudgetParams, DEFAULT_PAD, DEFAULT_RESERVED_COMPLETION};
use crate::error::RecordError;
use crate::llm::{Message, Role};

/// Full persisted state of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub model: String,
    pub budget: BudgetParams,
    pub turns: Vec<Message>,
    pub eviction_count: u64,
    pub session_id: Uuid,
    pub last_evicted: Option<Message>,
    pub system_prompt: Option<String>,
    pub reminder: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

type Object = Map<String, Value>;

impl SessionRecord {
    /// Parse and validate a record from JSON text.
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Validate a record from an already-parsed JSON value.
    ///
    /// Required: `model`, `budget`, `budget.ceiling`, `turns` (and each
    /// turn's `role` and `content`). Everything else falls back to a default:
    /// `reserved_completion` 1000, `pad` 500, `max_turns` unbounded,
    /// `eviction_count` 0, a fresh `session_id`, and `None` for the rest.
    pub fn from_value(value: &Value) -> Result<Self, RecordError> {
        let obj = value.as_object().ok_or_else(|| wrong_type("$", "object"))?;

        let model = required_str(obj, "model", "model")?;
        let budget = parse_budget(obj)?;

        let turns_value = obj
            .get("turns")
            .ok_or_else(|| RecordError::MissingField("turns".to_string()))?;
        let turns = turns_value
            .as_array()
            .ok_or_else(|| wrong_type("turns", "array"))?
            .iter()
            .enumerate()
            .map(|(i, v)| parse_message(v, &format!("turns[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        let eviction_count = optional_u64(obj, "eviction_count", "eviction_count")?.unwrap_or(0);

        let session_id = match non_null(obj, "session_id") {
            None => Uuid::now_v7(),
            Some(v) => v
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| wrong_type("session_id", "uuid string"))?,
        };

        let last_evicted = non_null(obj, "last_evicted")
            .map(|v| parse_message(v, "last_evicted"))
            .transpose()?;

        let system_prompt = optional_str(obj, "system_prompt")?;
        let reminder = optional_str(obj, "reminder")?;

        let saved_at = match non_null(obj, "saved_at") {
            None => None,
            Some(v) => Some(
                v.as_str()
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok_or_else(|| wrong_type("saved_at", "RFC 3339 timestamp"))?,
            ),
        };

        Ok(Self {
            model,
            budget,
            turns,
            eviction_count,
            session_id,
            last_evicted,
            system_prompt,
            reminder,
            saved_at,
        })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn parse_budget(obj: &Object) -> Result<BudgetParams, RecordError> {
    let budget = obj
        .get("budget")
        .ok_or_else(|| RecordError::MissingField("budget".to_string()))?
        .as_object()
        .ok_or_else(|| wrong_type("budget", "object"))?;

    let ceiling = optional_u64(budget, "ceiling", "budget.ceiling")?
        .ok_or_else(|| RecordError::MissingField("budget.ceiling".to_string()))?;
    let reserved_completion =
        optional_u64(budget, "reserved_completion", "budget.reserved_completion")?
            .unwrap_or(u64::from(DEFAULT_RESERVED_COMPLETION));
    let pad = optional_u64(budget, "pad", "budget.pad")?.unwrap_or(u64::from(DEFAULT_PAD));
    let max_turns = optional_u64(budget, "max_turns", "budget.max_turns")?;

    Ok(BudgetParams {
        ceiling: to_u32(ceiling, "budget.ceiling")?,
        reserved_completion: to_u32(reserved_completion, "budget.reserved_completion")?,
        pad: to_u32(pad, "budget.pad")?,
        max_turns: max_turns
            .map(|n| usize::try_from(n).map_err(|_| wrong_type("budget.max_turns", "usize")))
            .transpose()?,
    })
}

fn parse_message(value: &Value, path: &str) -> Result<Message, RecordError> {
    let obj = value.as_object().ok_or_else(|| wrong_type(path, "object"))?;
    let role_str = required_str(obj, "role", &format!("{path}.role"))?;
    let role: Role = role_str.parse().map_err(|_| RecordError::BadRole {
        field: format!("{path}.role"),
        role: role_str.clone(),
    })?;
    let content = required_str(obj, "content", &format!("{path}.content"))?;
    Ok(Message { role, content })
}

fn non_null<'a>(obj: &'a Object, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn required_str(obj: &Object, key: &str, path: &str) -> Result<String, RecordError> {
    obj.get(key)
        .ok_or_else(|| RecordError::MissingField(path.to_string()))?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(path, "string"))
}

fn optional_str(obj: &Object, key: &str) -> Result<Option<String>, RecordError> {
    non_null(obj, key)
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| wrong_type(key, "string"))
        })
        .transpose()
}

fn optional_u64(obj: &Object, key: &str, path: &str) -> Result<Option<u64>, RecordError> {
    non_null(obj, key)
        .map(|v| {
            v.as_u64()
                .ok_or_else(|| wrong_type(path, "non-negative integer"))
        })
        .transpose()
}

fn to_u32(n: u64, path: &str) -> Result<u32, RecordError> {
    u32::try_from(n).map_err(|_| wrong_type(path, "32-bit integer"))
}

fn wrong_type(field: &str, expected: &'static str) -> RecordError {
    RecordError::WrongType {
        field: field.to_string(),
        expected,
    }
}
