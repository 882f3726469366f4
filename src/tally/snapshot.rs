use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::agenda::{Item, VoteCounts, VoteResult, VoteSnapshot};

use super::passage::compute_passage;
use super::stats::MeetingStats;

/// Figures to display for an item: frozen ones if confirmed, live otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveTally {
    pub stats: MeetingStats,
    pub votes: VoteCounts,
    pub declaration: String,
    pub result: VoteResult,
    pub frozen: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Freeze the current figures on `item`.
///
/// Fails if the item already carries a snapshot; it has to be reset first.
pub fn confirm_snapshot(
    item: &mut Item,
    live_stats: MeetingStats,
    votes: VoteCounts,
    declaration: String,
    now: DateTime<Utc>,
) -> Result<VoteSnapshot, String> {
    if item.vote_snapshot.is_some() {
        return Err(format!("'{}' is already confirmed", item.title));
    }
    let passed = compute_passage(votes.yes, live_stats.total, item.kind);
    let snapshot = VoteSnapshot {
        stats: live_stats,
        votes,
        declaration,
        result: VoteResult::from_passed(passed),
        timestamp: now,
    };
    item.vote_snapshot = Some(snapshot.clone());
    Ok(snapshot)
}

/// Drop the snapshot and return to live figures. Returns the old snapshot.
pub fn reset_snapshot(item: &mut Item) -> Option<VoteSnapshot> {
    item.vote_snapshot.take()
}

pub fn effective_tally(item: &Item, live_stats: MeetingStats) -> EffectiveTally {
    match &item.vote_snapshot {
        Some(s) => EffectiveTally {
            stats: s.stats,
            votes: s.votes,
            declaration: s.declaration.clone(),
            result: s.result,
            frozen: true,
            confirmed_at: Some(s.timestamp),
        },
        None => EffectiveTally {
            stats: live_stats,
            votes: item.votes,
            declaration: item.declaration.clone().unwrap_or_default(),
            result: VoteResult::from_passed(compute_passage(item.votes.yes, live_stats.total, item.kind)),
            frozen: false,
            confirmed_at: None,
        },
    }
}
