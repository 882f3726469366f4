use crate::models::agenda::{ItemKind, VoteCounts};

pub fn threshold_phrase(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::TwoThirds => "2/3 이상",
        ItemKind::Majority | ItemKind::Election => "과반수 이상",
    }
}

/// Announcement read out by the chair once a vote is counted.
pub fn generate_declaration(title: &str, votes: VoteCounts, total: u32, kind: ItemKind, passed: bool) -> String {
    let (outcome, verdict) = if passed {
        ("충족하였으므로", "가결")
    } else {
        ("충족하지 못하였으므로", "부결")
    };
    format!(
        "「{title}」 안건에 대한 표결 결과를 선포합니다.\n\
         총 참석 {total}명 중 찬성 {yes}표, 반대 {no}표, 기권 {abstain}표로\n\
         참석자 {threshold} 찬성 요건을 {outcome}\n\
         본 안건은 {verdict}되었음을 선포합니다.",
        yes = votes.yes,
        no = votes.no,
        abstain = votes.abstain,
        threshold = threshold_phrase(kind),
    )
}

/// Declaration text being prepared in the console.
///
/// Follows the vote counts automatically until the operator starts typing or
/// the item is confirmed; after that only explicit edits change it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclarationDraft {
    text: String,
    manual: bool,
}

impl DeclarationDraft {
    pub fn new(text: impl Into<String>) -> Self {
        DeclarationDraft { text: text.into(), manual: false }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn begin_manual_edit(&mut self) {
        self.manual = true;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.manual = true;
        self.text = text.into();
    }

    /// Leave manual mode. The next vote change regenerates the text again.
    pub fn end_manual_edit(&mut self) {
        self.manual = false;
    }

    /// Regenerate after a vote-count change. Returns whether the text changed.
    pub fn on_votes_changed(
        &mut self,
        title: &str,
        votes: VoteCounts,
        total: u32,
        kind: ItemKind,
        passed: bool,
        confirmed: bool,
    ) -> bool {
        if self.manual || confirmed {
            return false;
        }
        let text = generate_declaration(title, votes, total, kind, passed);
        if text == self.text {
            return false;
        }
        self.text = text;
        true
    }
}
