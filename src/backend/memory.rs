use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::bus::Bus;
use crate::errors::AppError;
use crate::models::agenda::{Agenda, AgendaId, AgendaPatch, NewAgenda};
use crate::models::attendance::{AttendanceRecord, NewAttendance};
use crate::models::member::{Member, MemberId, NewMember};
use crate::models::settings::{ProjectorData, ProjectorMode, SystemSettings};
use crate::tally::assign_meeting_ids;

use super::{Backend, Change};

#[derive(Debug, Default)]
struct Tables {
    members: Vec<Member>,
    next_member_id: MemberId,
    attendance: BTreeMap<(MemberId, AgendaId), AttendanceRecord>,
    agendas: Vec<Agenda>,
    next_agenda_id: AgendaId,
    settings: SystemSettings,
    files: HashMap<String, Vec<u8>>,
}

impl Tables {
    fn folder_exists(&self, id: AgendaId) -> bool {
        self.agendas.iter().any(|a| a.id() == id && a.is_folder())
    }
}

/// Backend held entirely in memory. Used by the test suite and for running
/// the app without a database; `set_reachable(false)` makes every call fail
/// as if the network were down.
#[derive(Clone)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
    bus: Bus,
    reachable: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new(bus: Bus) -> Self {
        MemoryBackend {
            tables: Arc::new(Mutex::new(Tables {
                next_member_id: 1,
                next_agenda_id: 1,
                ..Tables::default()
            })),
            bus,
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Bytes stored by `upload_file` under `{bucket}/{path}`.
    pub fn file(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        let tables = self.tables.lock().ok()?;
        tables.files.get(&format!("{bucket}/{path}")).cloned()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(AppError::Connectivity("in-memory backend marked unreachable".into()));
        }
        self.tables
            .lock()
            .map_err(|_| AppError::Connectivity("in-memory backend lock poisoned".into()))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new(Bus::default())
    }
}

impl Backend for MemoryBackend {
    fn bus(&self) -> &Bus {
        &self.bus
    }

    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        let tables = self.tables()?;
        let mut members = tables.members.clone();
        members.sort_by(|a, b| a.unit.cmp(&b.unit).then(a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn import_members(&self, rows: Vec<NewMember>) -> Result<Vec<Member>, AppError> {
        let created = {
            let mut tables = self.tables()?;
            let mut created = Vec::new();
            for row in rows.iter().filter_map(NewMember::normalized) {
                let member = Member {
                    id: tables.next_member_id,
                    unit: row.unit,
                    name: row.name,
                    proxy: row.proxy,
                };
                tables.next_member_id += 1;
                tables.members.push(member.clone());
                created.push(member);
            }
            created
        };
        Change::MembersUpserted { members: created.clone() }.publish(&self.bus);
        Ok(created)
    }

    async fn set_member_proxy(&self, id: MemberId, proxy: Option<String>) -> Result<Member, AppError> {
        let updated = {
            let mut tables = self.tables()?;
            let member = tables
                .members
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(AppError::NotFound)?;
            member.proxy = proxy;
            member.clone()
        };
        Change::MembersUpserted { members: vec![updated.clone()] }.publish(&self.bus);
        Ok(updated)
    }

    async fn list_attendance(&self, meeting_id: Option<AgendaId>) -> Result<Vec<AttendanceRecord>, AppError> {
        let tables = self.tables()?;
        let mut records: Vec<AttendanceRecord> = tables
            .attendance
            .values()
            .filter(|r| meeting_id.is_none_or(|m| r.meeting_id == m))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.checked_in_at.cmp(&b.checked_in_at).then(a.member_id.cmp(&b.member_id)));
        Ok(records)
    }

    async fn upsert_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, AppError> {
        let record = {
            let mut tables = self.tables()?;
            if !tables.members.iter().any(|m| m.id == new.member_id) {
                return Err(AppError::Validation(format!("unknown member {}", new.member_id)));
            }
            if !tables.folder_exists(new.meeting_id) {
                return Err(AppError::Validation(format!("unknown meeting {}", new.meeting_id)));
            }
            let key = (new.member_id, new.meeting_id);
            let checked_in_at = tables
                .attendance
                .get(&key)
                .map_or_else(Utc::now, |existing| existing.checked_in_at);
            let record = new.into_record(checked_in_at);
            tables.attendance.insert(key, record.clone());
            record
        };
        Change::AttendanceUpserted { record: record.clone() }.publish(&self.bus);
        Ok(record)
    }

    async fn delete_attendance(&self, member_id: MemberId, meeting_id: AgendaId) -> Result<bool, AppError> {
        let deleted = self.tables()?.attendance.remove(&(member_id, meeting_id)).is_some();
        if deleted {
            Change::AttendanceDeleted { member_id, meeting_id }.publish(&self.bus);
        }
        Ok(deleted)
    }

    async fn list_agendas(&self) -> Result<Vec<Agenda>, AppError> {
        Ok(self.tables()?.agendas.clone())
    }

    async fn insert_agenda(&self, new: NewAgenda, after_order_index: Option<i32>) -> Result<Agenda, AppError> {
        new.validate().map_err(AppError::Validation)?;
        let (created, agendas) = {
            let mut tables = self.tables()?;
            let order_index = match after_order_index {
                Some(after) => {
                    for agenda in tables.agendas.iter_mut().filter(|a| a.order_index() > after) {
                        agenda.set_order_index(agenda.order_index() + 1);
                    }
                    after + 1
                }
                None => tables.agendas.iter().map(Agenda::order_index).max().map_or(0, |m| m + 1),
            };
            let id = tables.next_agenda_id;
            tables.next_agenda_id += 1;
            tables.agendas.push(new.into_agenda(id, order_index));
            assign_meeting_ids(&mut tables.agendas);
            let created = tables
                .agendas
                .iter()
                .find(|a| a.id() == id)
                .cloned()
                .ok_or(AppError::NotFound)?;
            (created, tables.agendas.clone())
        };
        Change::AgendasReplaced { agendas }.publish(&self.bus);
        Ok(created)
    }

    async fn update_agenda(&self, id: AgendaId, patch: AgendaPatch) -> Result<Agenda, AppError> {
        let (updated, agendas) = {
            let mut tables = self.tables()?;
            let agenda = tables
                .agendas
                .iter_mut()
                .find(|a| a.id() == id)
                .ok_or(AppError::NotFound)?;
            patch.apply(agenda).map_err(AppError::Validation)?;
            if patch.order_index.is_some() {
                assign_meeting_ids(&mut tables.agendas);
            }
            let updated = tables
                .agendas
                .iter()
                .find(|a| a.id() == id)
                .cloned()
                .ok_or(AppError::NotFound)?;
            (updated, tables.agendas.clone())
        };
        Change::AgendasReplaced { agendas }.publish(&self.bus);
        Ok(updated)
    }

    async fn delete_agenda(&self, id: AgendaId) -> Result<(), AppError> {
        let (agendas, settings) = {
            let mut tables = self.tables()?;
            let before = tables.agendas.len();
            tables.agendas.retain(|a| a.id() != id);
            if tables.agendas.len() == before {
                return Err(AppError::NotFound);
            }
            tables.attendance.retain(|(_, meeting_id), _| *meeting_id != id);
            if tables.settings.active_meeting_id == Some(id) {
                tables.settings.active_meeting_id = None;
            }
            assign_meeting_ids(&mut tables.agendas);
            (tables.agendas.clone(), tables.settings.clone())
        };
        Change::AgendasReplaced { agendas }.publish(&self.bus);
        Change::SettingsChanged { settings }.publish(&self.bus);
        Ok(())
    }

    async fn get_system_settings(&self) -> Result<SystemSettings, AppError> {
        Ok(self.tables()?.settings.clone())
    }

    async fn set_active_meeting(&self, meeting_id: Option<AgendaId>) -> Result<SystemSettings, AppError> {
        let settings = {
            let mut tables = self.tables()?;
            if let Some(id) = meeting_id {
                if !tables.folder_exists(id) {
                    return Err(AppError::Validation(format!("agenda {id} is not a meeting")));
                }
            }
            tables.settings.active_meeting_id = meeting_id;
            tables.settings.clone()
        };
        Change::SettingsChanged { settings: settings.clone() }.publish(&self.bus);
        Ok(settings)
    }

    async fn set_projector_mode(&self, mode: ProjectorMode, data: ProjectorData) -> Result<SystemSettings, AppError> {
        let settings = {
            let mut tables = self.tables()?;
            tables.settings.projector_mode = mode;
            tables.settings.projector_data = data;
            tables.settings.clone()
        };
        Change::SettingsChanged { settings: settings.clone() }.publish(&self.bus);
        Ok(settings)
    }

    async fn upload_file(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        let key = format!("{}/{}", bucket.trim_matches('/'), path.trim_start_matches('/'));
        if key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(AppError::Storage(format!("invalid path '{key}'")));
        }
        self.tables()?.files.insert(key.clone(), bytes);
        Ok(format!("/files/{key}"))
    }
}
