use crate::models::agenda::ItemKind;

/// Whether `votes_yes` out of `total` attendees carries the item.
///
/// Two-thirds items pass at `yes >= ceil(total * 2/3)`. Majority items (and
/// elections) need strictly more than half, so an exact half fails.
pub fn compute_passage(votes_yes: u32, total: u32, kind: ItemKind) -> bool {
    match kind {
        ItemKind::TwoThirds => {
            let threshold = (u64::from(total) * 2).div_ceil(3);
            u64::from(votes_yes) >= threshold
        }
        // yes > total / 2 without truncating the half
        ItemKind::Majority | ItemKind::Election => u64::from(votes_yes) * 2 > u64::from(total),
    }
}
