use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::models::agenda::AgendaId;
use crate::models::member::MemberId;

/// Channel through which a member's presence is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceType {
    Direct,
    Proxy,
    Written,
}

impl AttendanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceType::Direct => "direct",
            AttendanceType::Proxy => "proxy",
            AttendanceType::Written => "written",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(AttendanceType::Direct),
            "proxy" => Some(AttendanceType::Proxy),
            "written" => Some(AttendanceType::Written),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Yes,
    No,
    Abstain,
}

/// A pre-submitted choice on one agenda item (written ballots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub agenda_id: AgendaId,
    pub choice: Choice,
}

/// One member's check-in for one meeting. Unique per `(member_id, meeting_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub member_id: MemberId,
    pub meeting_id: AgendaId,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    pub proxy_name: Option<String>,
    #[serde(default)]
    pub votes: Vec<Ballot>,
    pub checked_in_at: DateTime<Utc>,
}

/// Write-side shape of a check-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttendance {
    pub member_id: MemberId,
    pub meeting_id: AgendaId,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    #[serde(default)]
    pub proxy_name: Option<String>,
    #[serde(default)]
    pub votes: Vec<Ballot>,
}

impl NewAttendance {
    pub fn into_record(self, checked_in_at: DateTime<Utc>) -> AttendanceRecord {
        AttendanceRecord {
            member_id: self.member_id,
            meeting_id: self.meeting_id,
            kind: self.kind,
            proxy_name: self.proxy_name,
            votes: self.votes,
            checked_in_at,
        }
    }
}

/// Raw `attendance` row; `kind` is stored as text.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttendanceRow {
    pub member_id: MemberId,
    pub meeting_id: AgendaId,
    pub kind: String,
    pub proxy_name: Option<String>,
    pub votes: Json<Vec<Ballot>>,
    pub checked_in_at: DateTime<Utc>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = sqlx::Error;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let kind = AttendanceType::parse(&row.kind).ok_or_else(|| {
            sqlx::Error::Protocol(format!("unknown attendance type '{}'", row.kind))
        })?;
        Ok(AttendanceRecord {
            member_id: row.member_id,
            meeting_id: row.meeting_id,
            kind,
            proxy_name: row.proxy_name,
            votes: row.votes.0,
            checked_in_at: row.checked_in_at,
        })
    }
}
