use serde::{Deserialize, Serialize};

use crate::models::agenda::{AgendaId, VoteCounts};
use crate::models::attendance::{AttendanceRecord, AttendanceType, Choice};

/// Per-meeting attendance counters. `total` is always the sum of the three channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingStats {
    pub direct: u32,
    pub proxy: u32,
    pub written: u32,
    pub total: u32,
}

/// Count the records of one meeting by attendance type.
pub fn compute_meeting_stats(meeting_id: Option<AgendaId>, records: &[AttendanceRecord]) -> MeetingStats {
    let Some(meeting_id) = meeting_id else {
        return MeetingStats::default();
    };
    let mut stats = MeetingStats::default();
    for record in records.iter().filter(|r| r.meeting_id == meeting_id) {
        match record.kind {
            AttendanceType::Direct => stats.direct += 1,
            AttendanceType::Proxy => stats.proxy += 1,
            AttendanceType::Written => stats.written += 1,
        }
    }
    stats.total = stats.direct + stats.proxy + stats.written;
    stats
}

/// Tally of pre-submitted written ballots for one agenda item.
pub fn written_ballot_counts(agenda_id: AgendaId, records: &[AttendanceRecord]) -> VoteCounts {
    let mut counts = VoteCounts::default();
    let ballots = records
        .iter()
        .filter(|r| r.kind == AttendanceType::Written)
        .flat_map(|r| r.votes.iter())
        .filter(|b| b.agenda_id == agenda_id);
    for ballot in ballots {
        match ballot.choice {
            Choice::Yes => counts.yes += 1,
            Choice::No => counts.no += 1,
            Choice::Abstain => counts.abstain += 1,
        }
    }
    counts
}

/// Memoises the last computed stats, keyed by meeting and attendance version.
///
/// The owner bumps the version whenever the attendance list changes.
#[derive(Debug, Default)]
pub struct StatsCache {
    key: Option<(Option<AgendaId>, u64)>,
    value: MeetingStats,
}

impl StatsCache {
    pub fn get(&mut self, meeting_id: Option<AgendaId>, version: u64, records: &[AttendanceRecord]) -> MeetingStats {
        if self.key != Some((meeting_id, version)) {
            self.value = compute_meeting_stats(meeting_id, records);
            self.key = Some((meeting_id, version));
        }
        self.value
    }
}
