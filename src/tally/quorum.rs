use serde::{Deserialize, Serialize};

use crate::models::agenda::ItemKind;

use super::stats::MeetingStats;

/// Attendance thresholds for one agenda item and whether they are met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumStatus {
    pub quorum_target: u32,
    /// Only meaningful for elections; 0 otherwise.
    pub direct_target: u32,
    pub is_direct_satisfied: bool,
    pub is_quorum_satisfied: bool,
    /// No roster loaded yet. Targets are 0 and the figures are not ready.
    pub roster_empty: bool,
}

fn ceil_fraction(n: u32, num: u64, den: u64) -> u32 {
    let scaled = u64::from(n) * num;
    u32::try_from(scaled.div_ceil(den)).unwrap_or(u32::MAX)
}

pub fn compute_quorum(total_members: u32, stats: &MeetingStats, kind: ItemKind) -> QuorumStatus {
    let quorum_target = match kind {
        ItemKind::TwoThirds => ceil_fraction(total_members, 2, 3),
        ItemKind::Majority | ItemKind::Election => ceil_fraction(total_members, 1, 2),
    };
    let (direct_target, is_direct_satisfied) = match kind {
        ItemKind::Election => {
            let target = ceil_fraction(total_members, 1, 5);
            (target, stats.direct >= target)
        }
        ItemKind::Majority | ItemKind::TwoThirds => (0, true),
    };
    QuorumStatus {
        quorum_target,
        direct_target,
        is_direct_satisfied,
        is_quorum_satisfied: stats.total >= quorum_target && is_direct_satisfied,
        roster_empty: total_members == 0,
    }
}

/// Share of `whole` in percent, rounded down. A zero `whole` counts as 1.
pub fn percent(part: u32, whole: u32) -> u32 {
    let whole = u64::from(whole.max(1));
    u32::try_from(u64::from(part) * 100 / whole).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_never_divides_by_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(3, 0), 300);
        assert_eq!(percent(1, 3), 33);
    }
}
