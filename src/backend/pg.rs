use sqlx::PgPool;

use crate::bus::Bus;
use crate::errors::AppError;
use crate::models::agenda::{self, Agenda, AgendaId, AgendaPatch, NewAgenda};
use crate::models::attendance::{self, AttendanceRecord, NewAttendance};
use crate::models::member::{self, Member, MemberId, NewMember};
use crate::models::settings::{self, ProjectorData, ProjectorMode, SystemSettings};
use crate::models::storage::FileStore;

use super::{Backend, Change};

/// Postgres-backed store. Change notifications go out on the in-process bus,
/// which the WebSocket endpoint relays to browser surfaces.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
    bus: Bus,
    files: FileStore,
}

impl PgBackend {
    pub fn new(pool: PgPool, bus: Bus, files: FileStore) -> Self {
        PgBackend { pool, bus, files }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The write already committed, so a failed re-read is only logged;
    /// subscribers catch up on their next full load.
    async fn publish_agendas(&self) {
        match agenda::find_all(&self.pool).await {
            Ok(agendas) => Change::AgendasReplaced { agendas }.publish(&self.bus),
            Err(e) => log::warn!("Agenda change not broadcast: {e}"),
        }
    }
}

impl Backend for PgBackend {
    fn bus(&self) -> &Bus {
        &self.bus
    }

    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        Ok(member::find_all(&self.pool).await?)
    }

    async fn import_members(&self, rows: Vec<NewMember>) -> Result<Vec<Member>, AppError> {
        let rows: Vec<NewMember> = rows.iter().filter_map(NewMember::normalized).collect();
        let members = member::insert_many(&self.pool, &rows).await?;
        log::info!("Imported {} members", members.len());
        Change::MembersUpserted { members: members.clone() }.publish(&self.bus);
        Ok(members)
    }

    async fn set_member_proxy(&self, id: MemberId, proxy: Option<String>) -> Result<Member, AppError> {
        let updated = member::update_proxy(&self.pool, id, proxy.as_deref())
            .await?
            .ok_or(AppError::NotFound)?;
        Change::MembersUpserted { members: vec![updated.clone()] }.publish(&self.bus);
        Ok(updated)
    }

    async fn list_attendance(&self, meeting_id: Option<AgendaId>) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(attendance::find_all(&self.pool, meeting_id).await?)
    }

    async fn upsert_attendance(&self, new: NewAttendance) -> Result<AttendanceRecord, AppError> {
        let record = attendance::upsert(&self.pool, &new).await?;
        Change::AttendanceUpserted { record: record.clone() }.publish(&self.bus);
        Ok(record)
    }

    async fn delete_attendance(&self, member_id: MemberId, meeting_id: AgendaId) -> Result<bool, AppError> {
        let deleted = attendance::delete(&self.pool, member_id, meeting_id).await?;
        if deleted {
            Change::AttendanceDeleted { member_id, meeting_id }.publish(&self.bus);
        }
        Ok(deleted)
    }

    async fn list_agendas(&self) -> Result<Vec<Agenda>, AppError> {
        Ok(agenda::find_all(&self.pool).await?)
    }

    async fn insert_agenda(&self, new: NewAgenda, after_order_index: Option<i32>) -> Result<Agenda, AppError> {
        new.validate().map_err(AppError::Validation)?;
        let created = agenda::insert(&self.pool, &new, after_order_index).await?;
        self.publish_agendas().await;
        Ok(created)
    }

    async fn update_agenda(&self, id: AgendaId, patch: AgendaPatch) -> Result<Agenda, AppError> {
        let mut current = agenda::find_by_id(&self.pool, id).await?.ok_or(AppError::NotFound)?;
        patch.apply(&mut current).map_err(AppError::Validation)?;
        let updated = agenda::update(&self.pool, id, &patch).await?.ok_or(AppError::NotFound)?;
        self.publish_agendas().await;
        Ok(updated)
    }

    async fn delete_agenda(&self, id: AgendaId) -> Result<(), AppError> {
        if !agenda::delete(&self.pool, id).await? {
            return Err(AppError::NotFound);
        }
        self.publish_agendas().await;
        // Deleting the active meeting clears it through the foreign key.
        match settings::get(&self.pool).await {
            Ok(settings) => Change::SettingsChanged { settings }.publish(&self.bus),
            Err(e) => log::warn!("Settings change not broadcast: {e}"),
        }
        Ok(())
    }

    async fn get_system_settings(&self) -> Result<SystemSettings, AppError> {
        Ok(settings::get(&self.pool).await?)
    }

    async fn set_active_meeting(&self, meeting_id: Option<AgendaId>) -> Result<SystemSettings, AppError> {
        let updated = settings::set_active_meeting(&self.pool, meeting_id).await?;
        Change::SettingsChanged { settings: updated.clone() }.publish(&self.bus);
        Ok(updated)
    }

    async fn set_projector_mode(&self, mode: ProjectorMode, data: ProjectorData) -> Result<SystemSettings, AppError> {
        let updated = settings::set_projector(&self.pool, mode, &data).await?;
        Change::SettingsChanged { settings: updated.clone() }.publish(&self.bus);
        Ok(updated)
    }

    async fn upload_file(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        self.files.upload(bucket, path, &bytes).await.map_err(AppError::Storage)
    }
}
