//! Quorum and results calculation.
//!
//! Pure aggregation over vote ledger rows. The lifecycle manager feeds this
//! at close time and persists the snapshot; nothing here touches storage.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::db::schema::{Poll, PollKind, PollOption, Vote};

/// Per-option tally line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    pub option_id: i64,
    pub label: String,
    pub count: u64,
}

/// Immutable results written onto the poll row at close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    /// One line per option, in display order, zero counts included.
    pub counts: Vec<OptionCount>,
    pub total: u64,
    /// Participation rate in percent; `None` when no quorum was evaluated or
    /// the eligible-member count was zero.
    pub participation_percent: Option<f64>,
    /// Only meaningful for formal polls with a quorum; informal polls and
    /// formal polls without one always pass.
    pub passed: bool,
}

/// Count ledger rows per option, zero-filling options nobody chose.
///
/// Output order follows the options' display order. Rows pointing at an
/// option not in `options` are ignored; the ledger's foreign keys make that
/// unreachable in practice.
pub fn count_votes(options: &[PollOption], votes: &[Vote]) -> Vec<OptionCount> {
    let mut per_option: HashMap<i64, u64> = HashMap::new();
    for vote in votes {
        if options.iter().any(|o| o.id == vote.id_option) {
            *per_option.entry(vote.id_option).or_insert(0) += 1;
        }
    }

    options
        .iter()
        .sorted_by_key(|o| o.display_order)
        .map(|o| OptionCount {
            option_id: o.id,
            label: o.label.clone(),
            count: per_option.get(&o.id).copied().unwrap_or(0),
        })
        .collect()
}

/// Decide whether a poll meets its quorum.
///
/// The decision uses exact integer arithmetic (`total * 100` against
/// `quorum * eligible`) so it never depends on floating-point rounding; the
/// percentage is computed separately for reporting only. With zero eligible
/// members the gate degenerates to `0 >= 0` and passes, which only arises
/// when the directory reports an empty electorate.
pub fn meets_quorum(quorum_percentage: u8, total: u64, eligible: u64) -> bool {
    total * 100 >= u64::from(quorum_percentage) * eligible
}

/// Build the final results snapshot for a poll from its ledger rows.
///
/// `eligible` is the directory's current eligible-member count; it is only
/// consulted for formal polls with a quorum percentage set.
pub fn build_snapshot(poll: &Poll, votes: &[Vote], eligible: u64) -> ResultsSnapshot {
    let counts = count_votes(&poll.options, votes);
    let total: u64 = counts.iter().map(|c| c.count).sum();

    match (poll.kind, poll.quorum_percentage) {
        (PollKind::Formal, Some(quorum)) => ResultsSnapshot {
            counts,
            total,
            participation_percent: (eligible > 0)
                .then(|| total as f64 * 100.0 / eligible as f64),
            passed: meets_quorum(quorum, total, eligible),
        },
        // Informal polls, and formal polls without a quorum, have no gate.
        _ => ResultsSnapshot {
            counts,
            total,
            participation_percent: None,
            passed: true,
        },
    }
}
