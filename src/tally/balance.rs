use serde::{Deserialize, Serialize};

use crate::models::agenda::VoteCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteField {
    Yes,
    No,
    Abstain,
}

/// Set one counter and recompute a partner so the three track `total`.
///
/// Editing yes or abstain recomputes no; editing no recomputes yes. Results
/// are floored at zero.
pub fn auto_balance(field: VoteField, new_value: u32, total: u32, current: VoteCounts) -> VoteCounts {
    let mut votes = current;
    match field {
        VoteField::Yes => {
            votes.yes = new_value;
            votes.no = total.saturating_sub(votes.yes).saturating_sub(votes.abstain);
        }
        VoteField::No => {
            votes.no = new_value;
            votes.yes = total.saturating_sub(votes.no).saturating_sub(votes.abstain);
        }
        VoteField::Abstain => {
            votes.abstain = new_value;
            votes.no = total.saturating_sub(votes.yes).saturating_sub(votes.abstain);
        }
    }
    votes
}

/// Apply an operator edit, balancing only when auto-calc is on.
pub fn edit_votes(field: VoteField, new_value: u32, total: u32, current: VoteCounts, auto_calc: bool) -> VoteCounts {
    if auto_calc {
        return auto_balance(field, new_value, total, current);
    }
    let mut votes = current;
    match field {
        VoteField::Yes => votes.yes = new_value,
        VoteField::No => votes.no = new_value,
        VoteField::Abstain => votes.abstain = new_value,
    }
    votes
}
