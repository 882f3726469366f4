//! Persistence and pub/sub collaborator.
//!
//! Every surface talks to shared state only through [`Backend`]. Writes are
//! last-write-wins per field; after each write the backend publishes a
//! [`Change`] on the bus so other surfaces can catch up.

pub mod memory;
pub mod pg;

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::mpsc;

use crate::bus::{Bus, BusMessage, channels, events};
use crate::errors::AppError;
use crate::models::agenda::{Agenda, AgendaId, AgendaPatch, NewAgenda};
use crate::models::attendance::{AttendanceRecord, NewAttendance};
use crate::models::member::{Member, MemberId, NewMember};
use crate::models::settings::{ProjectorData, ProjectorMode, SystemSettings};

pub use memory::MemoryBackend;
pub use pg::PgBackend;

/// Row-level change notification carried on the `db` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    MembersUpserted { members: Vec<Member> },
    AttendanceUpserted { record: AttendanceRecord },
    AttendanceDeleted { member_id: MemberId, meeting_id: AgendaId },
    /// Agenda writes can renumber and re-parent several rows, so the whole
    /// ordered list is sent.
    AgendasReplaced { agendas: Vec<Agenda> },
    SettingsChanged { settings: SystemSettings },
}

impl Change {
    pub fn event(&self) -> &'static str {
        match self {
            Change::MembersUpserted { .. } => events::MEMBERS,
            Change::AttendanceUpserted { .. } | Change::AttendanceDeleted { .. } => events::ATTENDANCE,
            Change::AgendasReplaced { .. } => events::AGENDAS,
            Change::SettingsChanged { .. } => events::SETTINGS,
        }
    }

    pub fn from_message(msg: &BusMessage) -> Option<Change> {
        if msg.channel != channels::DB {
            return None;
        }
        serde_json::from_value(msg.payload.clone()).ok()
    }

    pub fn publish(&self, bus: &Bus) {
        let payload = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Failed to encode change notification: {e}");
                return;
            }
        };
        bus.publish(channels::DB, self.event(), payload);
    }
}

pub trait Backend: Clone + Send + Sync + 'static {
    fn bus(&self) -> &Bus;

    fn list_members(&self) -> impl Future<Output = Result<Vec<Member>, AppError>> + Send;

    fn import_members(&self, rows: Vec<NewMember>) -> impl Future<Output = Result<Vec<Member>, AppError>> + Send;

    fn set_member_proxy(
        &self,
        id: MemberId,
        proxy: Option<String>,
    ) -> impl Future<Output = Result<Member, AppError>> + Send;

    fn list_attendance(
        &self,
        meeting_id: Option<AgendaId>,
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, AppError>> + Send;

    /// Insert or replace the record keyed by `(member_id, meeting_id)`.
    fn upsert_attendance(&self, new: NewAttendance) -> impl Future<Output = Result<AttendanceRecord, AppError>> + Send;

    fn delete_attendance(
        &self,
        member_id: MemberId,
        meeting_id: AgendaId,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Agendas in list order, items stamped with their meeting.
    fn list_agendas(&self) -> impl Future<Output = Result<Vec<Agenda>, AppError>> + Send;

    fn insert_agenda(
        &self,
        new: NewAgenda,
        after_order_index: Option<i32>,
    ) -> impl Future<Output = Result<Agenda, AppError>> + Send;

    fn update_agenda(&self, id: AgendaId, patch: AgendaPatch) -> impl Future<Output = Result<Agenda, AppError>> + Send;

    fn delete_agenda(&self, id: AgendaId) -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_system_settings(&self) -> impl Future<Output = Result<SystemSettings, AppError>> + Send;

    fn set_active_meeting(
        &self,
        meeting_id: Option<AgendaId>,
    ) -> impl Future<Output = Result<SystemSettings, AppError>> + Send;

    fn set_projector_mode(
        &self,
        mode: ProjectorMode,
        data: ProjectorData,
    ) -> impl Future<Output = Result<SystemSettings, AppError>> + Send;

    /// Store a file and return its public URL.
    fn upload_file(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    fn subscribe(&self, channel: &str) -> mpsc::UnboundedReceiver<BusMessage> {
        self.bus().subscribe(channel)
    }
}
