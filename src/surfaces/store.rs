use tokio::sync::mpsc;

use crate::backend::{Backend, Change};
use crate::bus::BusMessage;
use crate::errors::AppError;
use crate::models::agenda::{Agenda, AgendaId, Item};
use crate::models::attendance::{AttendanceRecord, NewAttendance};
use crate::models::member::{Member, MemberId};
use crate::models::settings::SystemSettings;
use crate::tally::{MeetingStats, StatsCache, resolve_meeting_context};

/// What changed, sent to every listener after the store is updated.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Members,
    Attendance,
    Agendas,
    Settings {
        previous_active: Option<AgendaId>,
        active: Option<AgendaId>,
    },
}

/// Local copy of the shared state for one surface.
///
/// Updates arrive as [`Change`]s and are applied in the order received.
/// Listeners are plain channels; closed ones are pruned on the next notify.
#[derive(Debug, Default)]
pub struct Store {
    members: Vec<Member>,
    attendance: Vec<AttendanceRecord>,
    agendas: Vec<Agenda>,
    settings: SystemSettings,
    attendance_version: u64,
    stats_cache: StatsCache,
    listeners: Vec<mpsc::UnboundedSender<StoreEvent>>,
}

impl Store {
    pub fn new(
        members: Vec<Member>,
        attendance: Vec<AttendanceRecord>,
        agendas: Vec<Agenda>,
        settings: SystemSettings,
    ) -> Self {
        Store {
            members,
            attendance,
            agendas,
            settings,
            ..Store::default()
        }
    }

    /// Full read of everything a surface renders.
    pub async fn load<B: Backend>(backend: &B) -> Result<Store, AppError> {
        let members = backend.list_members().await?;
        let attendance = backend.list_attendance(None).await?;
        let agendas = backend.list_agendas().await?;
        let settings = backend.get_system_settings().await?;
        Ok(Store::new(members, attendance, agendas, settings))
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StoreEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    fn notify(&mut self, event: StoreEvent) {
        self.listeners.retain(|l| l.send(event.clone()).is_ok());
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn total_members(&self) -> u32 {
        u32::try_from(self.members.len()).unwrap_or(u32::MAX)
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn attendance_version(&self) -> u64 {
        self.attendance_version
    }

    pub fn agendas(&self) -> &[Agenda] {
        &self.agendas
    }

    pub fn agenda(&self, id: AgendaId) -> Option<&Agenda> {
        self.agendas.iter().find(|a| a.id() == id)
    }

    pub fn item(&self, id: AgendaId) -> Option<&Item> {
        self.agenda(id).and_then(Agenda::as_item)
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn is_checked_in(&self, member_id: MemberId, meeting_id: AgendaId) -> bool {
        self.attendance
            .iter()
            .any(|r| r.member_id == member_id && r.meeting_id == meeting_id)
    }

    /// Meeting owning `agenda_id`. Uses the stored parent reference, falling
    /// back to a positional scan for rows written before it was assigned.
    pub fn meeting_of(&self, agenda_id: AgendaId) -> Option<AgendaId> {
        match self.agenda(agenda_id)? {
            Agenda::Folder(f) => Some(f.id),
            Agenda::Item(i) => i.meeting_id.or_else(|| resolve_meeting_context(&self.agendas, agenda_id)),
        }
    }

    pub fn meeting_stats(&mut self, meeting_id: Option<AgendaId>) -> MeetingStats {
        self.stats_cache.get(meeting_id, self.attendance_version, &self.attendance)
    }

    /// Live stats of the meeting `agenda_id` belongs to.
    pub fn live_stats_for(&mut self, agenda_id: AgendaId) -> MeetingStats {
        let meeting_id = self.meeting_of(agenda_id);
        self.meeting_stats(meeting_id)
    }

    fn put_attendance(&mut self, record: AttendanceRecord) {
        match self
            .attendance
            .iter_mut()
            .find(|r| r.member_id == record.member_id && r.meeting_id == record.meeting_id)
        {
            Some(existing) => *existing = record,
            None => self.attendance.push(record),
        }
        self.attendance_version += 1;
    }

    fn remove_attendance(&mut self, member_id: MemberId, meeting_id: AgendaId) -> Option<AttendanceRecord> {
        let pos = self
            .attendance
            .iter()
            .position(|r| r.member_id == member_id && r.meeting_id == meeting_id)?;
        self.attendance_version += 1;
        Some(self.attendance.remove(pos))
    }

    /// Reduce one change into the store and notify listeners.
    pub fn apply(&mut self, change: Change) {
        match change {
            Change::MembersUpserted { members } => {
                for member in members {
                    match self.members.iter_mut().find(|m| m.id == member.id) {
                        Some(existing) => *existing = member,
                        None => self.members.push(member),
                    }
                }
                self.notify(StoreEvent::Members);
            }
            Change::AttendanceUpserted { record } => {
                self.put_attendance(record);
                self.notify(StoreEvent::Attendance);
            }
            Change::AttendanceDeleted { member_id, meeting_id } => {
                if self.remove_attendance(member_id, meeting_id).is_some() {
                    self.notify(StoreEvent::Attendance);
                }
            }
            Change::AgendasReplaced { agendas } => {
                let ids: Vec<AgendaId> = agendas.iter().map(Agenda::id).collect();
                let before = self.attendance.len();
                self.attendance.retain(|r| ids.contains(&r.meeting_id));
                if self.attendance.len() != before {
                    self.attendance_version += 1;
                }
                self.agendas = agendas;
                self.notify(StoreEvent::Agendas);
            }
            Change::SettingsChanged { settings } => {
                let previous_active = self.settings.active_meeting_id;
                let active = settings.active_meeting_id;
                self.settings = settings;
                self.notify(StoreEvent::Settings { previous_active, active });
            }
        }
    }

    /// Replace one agenda with the copy a write returned, ahead of the
    /// broadcast that will carry the full list.
    pub fn put_agenda(&mut self, agenda: Agenda) {
        match self.agendas.iter_mut().find(|a| a.id() == agenda.id()) {
            Some(existing) => *existing = agenda,
            None => self.agendas.push(agenda),
        }
        self.notify(StoreEvent::Agendas);
    }

    /// Apply a bus message if it is a row change. Returns whether it was.
    pub fn apply_message(&mut self, msg: &BusMessage) -> bool {
        match Change::from_message(msg) {
            Some(change) => {
                self.apply(change);
                true
            }
            None => false,
        }
    }

    /// Record a check-in locally first, then write it.
    ///
    /// On failure the local state is put back as it was and the error is
    /// returned for the operator to retry.
    pub async fn check_in_optimistic<B: Backend>(
        &mut self,
        backend: &B,
        new: NewAttendance,
    ) -> Result<AttendanceRecord, AppError> {
        let previous = self
            .attendance
            .iter()
            .find(|r| r.member_id == new.member_id && r.meeting_id == new.meeting_id)
            .cloned();
        self.put_attendance(new.clone().into_record(chrono::Utc::now()));
        self.notify(StoreEvent::Attendance);

        match backend.upsert_attendance(new.clone()).await {
            Ok(record) => {
                self.put_attendance(record.clone());
                Ok(record)
            }
            Err(e) => {
                log::warn!("Check-in of member {} rolled back: {e}", new.member_id);
                match previous {
                    Some(record) => self.put_attendance(record),
                    None => {
                        self.remove_attendance(new.member_id, new.meeting_id);
                    }
                }
                self.notify(StoreEvent::Attendance);
                Err(e)
            }
        }
    }

    /// Remove a check-in locally first, restoring it if the delete fails.
    pub async fn cancel_check_in_optimistic<B: Backend>(
        &mut self,
        backend: &B,
        member_id: MemberId,
        meeting_id: AgendaId,
    ) -> Result<bool, AppError> {
        let removed = self.remove_attendance(member_id, meeting_id);
        if removed.is_some() {
            self.notify(StoreEvent::Attendance);
        }
        match backend.delete_attendance(member_id, meeting_id).await {
            Ok(deleted) => Ok(deleted),
            Err(e) => {
                if let Some(record) = removed {
                    log::warn!("Cancel of member {member_id} rolled back: {e}");
                    self.put_attendance(record);
                    self.notify(StoreEvent::Attendance);
                }
                Err(e)
            }
        }
    }
}
