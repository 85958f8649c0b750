//! crates/evaluation_core/src/domain.rs
//!
//! Defines the pure, core data structures for evaluation sessions.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default wall-clock limit for a single evaluation attempt.
pub const DEFAULT_TIME_LIMIT_MINUTES: i64 = 120;

/// Default number of tab switches at which a session is invalidated.
pub const DEFAULT_MAX_TAB_SWITCHES: i32 = 3;

//=========================================================================================
// Evaluation Session Record
//=========================================================================================

/// One evaluation attempt by one user for one skill/level pair.
///
/// `is_active` only ever moves from `true` to `false`. Exactly one of
/// `completed_at` / `invalidated_at` is set once the session is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub evaluation_id: Uuid,
    pub skill: String,
    pub level: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub is_active: bool,
    pub tab_switches: i32,
    pub question_ids: Vec<String>,
    pub invalidation_reason: Option<InvalidationReason>,
    pub completed_at: Option<DateTime<Utc>>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl EvaluationSession {
    /// Builds a fresh, active session starting at `now`.
    ///
    /// The identifier is a random v4 UUID, so it cannot be enumerated from
    /// neighbouring sessions.
    pub fn new(
        user_id: Uuid,
        evaluation_id: Uuid,
        skill: impl Into<String>,
        level: impl Into<String>,
        question_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            evaluation_id,
            skill: skill.into(),
            level: level.into(),
            started_at: now,
            last_activity: now,
            is_active: true,
            tab_switches: 0,
            question_ids,
            invalidation_reason: None,
            completed_at: None,
            invalidated_at: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else if self.invalidated_at.is_some() || !self.is_active {
            SessionStatus::Invalidated
        } else {
            SessionStatus::Active
        }
    }

    /// Time elapsed since the session started, measured against `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }
}

/// The lifecycle state of a session. `Completed` and `Invalidated` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Invalidated,
}

//=========================================================================================
// Invalidation Reasons
//=========================================================================================

/// Why a session was forcibly terminated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// The session outlived its time limit.
    Timeout,
    /// The tab-switch counter reached the policy threshold.
    TooManyTabSwitches,
    /// Any other abort condition detected by the caller.
    Other(String),
}

impl InvalidationReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Timeout => "timeout",
            Self::TooManyTabSwitches => "too_many_tab_switches",
            Self::Other(reason) => reason,
        }
    }
}

impl From<&str> for InvalidationReason {
    fn from(value: &str) -> Self {
        match value {
            "timeout" => Self::Timeout,
            "too_many_tab_switches" => Self::TooManyTabSwitches,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for InvalidationReason {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InvalidationReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InvalidationReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw))
    }
}

//=========================================================================================
// Policy
//=========================================================================================

/// Anti-cheating limits applied by the `SessionManager`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub time_limit: Duration,
    pub max_tab_switches: i32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            time_limit: Duration::minutes(DEFAULT_TIME_LIMIT_MINUTES),
            max_tab_switches: DEFAULT_MAX_TAB_SWITCHES,
        }
    }
}
