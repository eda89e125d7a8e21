use chrono::{DateTime, Utc};

use crate::roles::Visibility;
use crate::tally::ResultsSnapshot;

/// Whether a poll is a binding resolution or a straw poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum PollKind {
    Informal,
    Formal,
}

/// Identity disclosure mode for votes on a poll. Mutually exclusive: a poll
/// stores either keyed hashes or raw member ids, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum VotingMethod {
    Anonymous,
    Identifiable,
}

#[derive(Debug)]
pub struct Poll {
    pub id: i64,
    pub time_created: DateTime<Utc>,
    pub id_org: String,
    pub id_created_by: String,
    pub open: bool,
    pub title: String,
    pub description: String,
    pub kind: PollKind,
    pub visibility: Visibility,
    pub voting_method: VotingMethod,
    /// 0–100; only honored when `kind` is formal.
    pub quorum_percentage: Option<u8>,
    pub end_time: Option<DateTime<Utc>>,
    /// Written once at close, immutable afterwards.
    pub final_results: Option<ResultsSnapshot>,
    pub options: Vec<PollOption>,
}

#[derive(Debug)]
pub struct PollOption {
    pub id_poll: i64,
    pub id: i64,
    pub label: String,
    pub display_order: i64,
}

#[derive(Debug)]
pub struct Vote {
    pub id_poll: i64,
    pub id_option: i64,
    /// Populated for identifiable polls.
    pub id_member: Option<String>,
    /// Populated for anonymous polls.
    pub hashed_identifier: Option<String>,
    pub time_created: DateTime<Utc>,
}
