use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::types::Json;

use crate::tally::MeetingStats;

pub type AgendaId = i64;

/// Voting rule of an agenda item. `general` and `special` are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "majority", alias = "general")]
    Majority,
    #[serde(rename = "twoThirds", alias = "special")]
    TwoThirds,
    #[serde(rename = "election")]
    Election,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Majority => "majority",
            ItemKind::TwoThirds => "twoThirds",
            ItemKind::Election => "election",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "majority" | "general" => Some(ItemKind::Majority),
            "twoThirds" | "special" => Some(ItemKind::TwoThirds),
            "election" => Some(ItemKind::Election),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteCounts {
    pub yes: u32,
    pub no: u32,
    pub abstain: u32,
}

/// Largest count or page number the `INTEGER` columns can hold.
pub const MAX_STORED_VALUE: u32 = i32::MAX as u32;

fn check_stored(field: &str, value: u64) -> Result<(), String> {
    if value > u64::from(MAX_STORED_VALUE) {
        return Err(format!("{field} {value} exceeds the limit of {MAX_STORED_VALUE}"));
    }
    Ok(())
}

impl VoteCounts {
    pub fn new(yes: u32, no: u32, abstain: u32) -> Self {
        VoteCounts { yes, no, abstain }
    }

    /// Each counter and their sum must fit a stored column.
    pub fn validate(&self) -> Result<(), String> {
        check_stored("yes votes", self.yes.into())?;
        check_stored("no votes", self.no.into())?;
        check_stored("abstentions", self.abstain.into())?;
        check_stored(
            "total votes",
            u64::from(self.yes) + u64::from(self.no) + u64::from(self.abstain),
        )
    }

    pub fn sum(&self) -> u32 {
        self.yes + self.no + self.abstain
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteResult {
    Passed,
    Failed,
}

impl VoteResult {
    pub fn from_passed(passed: bool) -> Self {
        if passed { VoteResult::Passed } else { VoteResult::Failed }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, VoteResult::Passed)
    }
}

/// Frozen copy of a published decision. Never mutated; replaced only by
/// clearing it and confirming again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteSnapshot {
    pub stats: MeetingStats,
    pub votes: VoteCounts,
    pub declaration: String,
    pub result: VoteResult,
    pub timestamp: DateTime<Utc>,
}

/// A meeting/session header. Owns every item that follows it in list order
/// up to the next folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: AgendaId,
    pub order_index: i32,
    pub title: String,
    /// Master presentation for the whole session.
    pub presentation_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: AgendaId,
    pub order_index: i32,
    /// Owning folder, assigned whenever the list order changes.
    pub meeting_id: Option<AgendaId>,
    pub kind: ItemKind,
    pub title: String,
    pub presentation_url: Option<String>,
    pub start_page: Option<u32>,
    pub votes: VoteCounts,
    pub declaration: Option<String>,
    pub vote_snapshot: Option<VoteSnapshot>,
}

impl Item {
    pub fn is_confirmed(&self) -> bool {
        self.vote_snapshot.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Agenda {
    Folder(Folder),
    Item(Item),
}

impl Agenda {
    pub fn id(&self) -> AgendaId {
        match self {
            Agenda::Folder(f) => f.id,
            Agenda::Item(i) => i.id,
        }
    }

    pub fn order_index(&self) -> i32 {
        match self {
            Agenda::Folder(f) => f.order_index,
            Agenda::Item(i) => i.order_index,
        }
    }

    pub fn set_order_index(&mut self, order_index: i32) {
        match self {
            Agenda::Folder(f) => f.order_index = order_index,
            Agenda::Item(i) => i.order_index = order_index,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Agenda::Folder(f) => &f.title,
            Agenda::Item(i) => &i.title,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Agenda::Folder(_))
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Agenda::Item(i) => Some(i),
            Agenda::Folder(_) => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut Item> {
        match self {
            Agenda::Item(i) => Some(i),
            Agenda::Folder(_) => None,
        }
    }
}

/// Insert payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NewAgenda {
    Folder {
        title: String,
        #[serde(default)]
        presentation_url: Option<String>,
    },
    Item {
        kind: ItemKind,
        title: String,
        #[serde(default)]
        presentation_url: Option<String>,
        #[serde(default)]
        start_page: Option<u32>,
    },
}

impl NewAgenda {
    pub fn title(&self) -> &str {
        match self {
            NewAgenda::Folder { title, .. } | NewAgenda::Item { title, .. } => title,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            NewAgenda::Item { start_page: Some(page), .. } => check_stored("start page", (*page).into()),
            _ => Ok(()),
        }
    }

    /// Build the stored agenda with the given id and position.
    pub fn into_agenda(self, id: AgendaId, order_index: i32) -> Agenda {
        match self {
            NewAgenda::Folder { title, presentation_url } => Agenda::Folder(Folder {
                id,
                order_index,
                title,
                presentation_url,
            }),
            NewAgenda::Item { kind, title, presentation_url, start_page } => Agenda::Item(Item {
                id,
                order_index,
                meeting_id: None,
                kind,
                title,
                presentation_url,
                start_page,
                votes: VoteCounts::default(),
                declaration: None,
                vote_snapshot: None,
            }),
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Partial update. Only the fields present are written, so two consoles
/// editing different fields of the same agenda do not clobber each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgendaPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub order_index: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub presentation_url: Option<Option<String>>,
    #[serde(default)]
    pub kind: Option<ItemKind>,
    #[serde(default, deserialize_with = "double_option")]
    pub start_page: Option<Option<u32>>,
    #[serde(default)]
    pub votes: Option<VoteCounts>,
    #[serde(default, deserialize_with = "double_option")]
    pub declaration: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub vote_snapshot: Option<Option<VoteSnapshot>>,
}

impl AgendaPatch {
    pub fn is_empty(&self) -> bool {
        *self == AgendaPatch::default()
    }

    pub fn touches_item_fields(&self) -> bool {
        self.kind.is_some()
            || self.start_page.is_some()
            || self.votes.is_some()
            || self.declaration.is_some()
            || self.vote_snapshot.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(Some(page)) = self.start_page {
            check_stored("start page", page.into())?;
        }
        if let Some(votes) = &self.votes {
            votes.validate()?;
        }
        Ok(())
    }

    /// Apply to an in-memory agenda. Item-only fields on a folder are
    /// rejected, as are values too large to store.
    pub fn apply(&self, agenda: &mut Agenda) -> Result<(), String> {
        if agenda.is_folder() && self.touches_item_fields() {
            return Err(format!("agenda {} is a meeting folder and has no vote fields", agenda.id()));
        }
        self.validate()?;
        if let Some(order_index) = self.order_index {
            agenda.set_order_index(order_index);
        }
        match agenda {
            Agenda::Folder(f) => {
                if let Some(title) = &self.title {
                    f.title = title.clone();
                }
                if let Some(url) = &self.presentation_url {
                    f.presentation_url = url.clone();
                }
            }
            Agenda::Item(i) => {
                if let Some(title) = &self.title {
                    i.title = title.clone();
                }
                if let Some(url) = &self.presentation_url {
                    i.presentation_url = url.clone();
                }
                if let Some(kind) = self.kind {
                    i.kind = kind;
                }
                if let Some(page) = self.start_page {
                    i.start_page = page;
                }
                if let Some(votes) = self.votes {
                    i.votes = votes;
                }
                if let Some(declaration) = &self.declaration {
                    i.declaration = declaration.clone();
                }
                if let Some(snapshot) = &self.vote_snapshot {
                    i.vote_snapshot = snapshot.clone();
                }
            }
        }
        Ok(())
    }
}

/// Raw `agendas` row. `kind` is `folder` or one of the item kinds.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AgendaRow {
    pub id: AgendaId,
    pub order_index: i32,
    pub kind: String,
    pub title: String,
    pub presentation_url: Option<String>,
    pub start_page: Option<i32>,
    pub meeting_id: Option<AgendaId>,
    pub votes_yes: i32,
    pub votes_no: i32,
    pub votes_abstain: i32,
    pub declaration: Option<String>,
    pub vote_snapshot: Option<Json<VoteSnapshot>>,
}

fn non_negative(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}

impl TryFrom<AgendaRow> for Agenda {
    type Error = sqlx::Error;

    fn try_from(row: AgendaRow) -> Result<Self, Self::Error> {
        if row.kind == "folder" {
            return Ok(Agenda::Folder(Folder {
                id: row.id,
                order_index: row.order_index,
                title: row.title,
                presentation_url: row.presentation_url,
            }));
        }
        let kind = ItemKind::parse(&row.kind)
            .ok_or_else(|| sqlx::Error::Protocol(format!("unknown agenda type '{}'", row.kind)))?;
        Ok(Agenda::Item(Item {
            id: row.id,
            order_index: row.order_index,
            meeting_id: row.meeting_id,
            kind,
            title: row.title,
            presentation_url: row.presentation_url,
            start_page: row.start_page.map(non_negative),
            votes: VoteCounts::new(
                non_negative(row.votes_yes),
                non_negative(row.votes_no),
                non_negative(row.votes_abstain),
            ),
            declaration: row.declaration,
            vote_snapshot: row.vote_snapshot.map(|j| j.0),
        }))
    }
}
