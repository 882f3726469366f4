use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::models::agenda::AgendaId;

/// What the audience-facing display currently shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectorMode {
    #[default]
    Idle,
    Ppt,
    Waiting,
    Result,
    /// Blank screen while published numbers are being corrected.
    Adjusting,
}

impl ProjectorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectorMode::Idle => "IDLE",
            ProjectorMode::Ppt => "PPT",
            ProjectorMode::Waiting => "WAITING",
            ProjectorMode::Result => "RESULT",
            ProjectorMode::Adjusting => "ADJUSTING",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IDLE" => Some(ProjectorMode::Idle),
            "PPT" => Some(ProjectorMode::Ppt),
            "WAITING" => Some(ProjectorMode::Waiting),
            "RESULT" => Some(ProjectorMode::Result),
            "ADJUSTING" => Some(ProjectorMode::Adjusting),
            _ => None,
        }
    }
}

/// Auxiliary payload carried with the projector mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectorData {
    /// Agenda the screen is about (slide, waiting title, or result).
    #[serde(default)]
    pub agenda_id: Option<AgendaId>,
    /// Page to show in PPT mode.
    #[serde(default)]
    pub page: Option<u32>,
}

/// System-wide singleton shared by every surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub active_meeting_id: Option<AgendaId>,
    pub projector_mode: ProjectorMode,
    #[serde(default)]
    pub projector_data: ProjectorData,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SettingsRow {
    pub active_meeting_id: Option<AgendaId>,
    pub projector_mode: String,
    pub projector_data: Json<ProjectorData>,
}

impl From<SettingsRow> for SystemSettings {
    fn from(row: SettingsRow) -> Self {
        let projector_mode = ProjectorMode::parse(&row.projector_mode).unwrap_or_else(|| {
            log::warn!("Unknown projector mode '{}' in settings, using IDLE", row.projector_mode);
            ProjectorMode::Idle
        });
        SystemSettings {
            active_meeting_id: row.active_meeting_id,
            projector_mode,
            projector_data: row.projector_data.0,
        }
    }
}
