use serde::{Deserialize, Serialize};

pub type MemberId = i64;

/// Roster entry. Created at import time; only `proxy` changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    pub id: MemberId,
    /// Physical unit label (e.g. "101동 1203호").
    pub unit: String,
    pub name: String,
    /// Delegate name on file, if any.
    pub proxy: Option<String>,
}

/// One row of a roster import.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub unit: String,
    pub name: String,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl NewMember {
    /// Trims the fields and rejects rows without a unit or name.
    pub fn normalized(&self) -> Option<NewMember> {
        let unit = self.unit.trim();
        let name = self.name.trim();
        if unit.is_empty() || name.is_empty() {
            return None;
        }
        let proxy = self
            .proxy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);
        Some(NewMember {
            unit: unit.to_string(),
            name: name.to_string(),
            proxy,
        })
    }
}
