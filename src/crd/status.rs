//! # BitwardenSecret Status
//!
//! Status types for tracking sync state and conditions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Status of the BitwardenSecret resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitwardenSecretStatus {
    /// Time of the last successful sync (RFC3339)
    /// Also the `lastSyncedDate` watermark for the next delta pull
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_sync_time: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    pub fn new(
        r#type: &str,
        status: bool,
        reason: &str,
        message: impl Into<String>,
        observed_generation: Option<i64>,
    ) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: None,
            reason: Some(reason.to_string()),
            message: Some(message.into()),
            observed_generation,
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

impl BitwardenSecretStatus {
    /// Parsed `last_successful_sync_time`
    ///
    /// An unparseable value is treated as never synced.
    #[must_use]
    pub fn last_successful_sync(&self) -> Option<DateTime<Utc>> {
        self.last_successful_sync_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Advance the sync watermark to `now`
    ///
    /// The watermark never moves backwards: a clock running behind the stored
    /// value leaves it untouched.
    pub fn record_successful_sync(&mut self, now: DateTime<Utc>) {
        let next = match self.last_successful_sync() {
            Some(prior) if prior > now => prior,
            _ => now,
        };
        self.last_successful_sync_time = Some(format_time(next));
    }

    /// Find a condition by type
    #[must_use]
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == r#type)
    }

    /// Insert or replace the condition with the same type
    ///
    /// Conditions of other types keep their position. The transition time only
    /// moves when the status value flips.
    pub fn set_condition(&mut self, mut condition: Condition, now: DateTime<Utc>) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) => {
                condition.last_transition_time = if existing.status == condition.status {
                    existing
                        .last_transition_time
                        .take()
                        .or_else(|| Some(format_time(now)))
                } else {
                    Some(format_time(now))
                };
                *existing = condition;
            }
            None => {
                condition.last_transition_time = Some(format_time(now));
                self.conditions.push(condition);
            }
        }
    }
}

/// RFC3339 with millisecond precision, UTC `Z` suffix
pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
