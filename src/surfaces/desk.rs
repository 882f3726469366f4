use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::backend::Backend;
use crate::bus::{BusMessage, channels};
use crate::errors::AppError;
use crate::models::agenda::AgendaId;
use crate::models::attendance::{AttendanceRecord, AttendanceType, Ballot, NewAttendance};
use crate::models::member::{Member, MemberId};
use crate::models::settings::SystemSettings;
use crate::tally::MeetingStats;

use super::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub member_id: MemberId,
    #[serde(rename = "type")]
    pub kind: AttendanceType,
    #[serde(default)]
    pub proxy_name: Option<String>,
    #[serde(default)]
    pub votes: Vec<Ballot>,
}

/// Roster row as the desk shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStatus {
    pub member: Member,
    pub checked_in: Option<AttendanceType>,
}

/// The meeting a desk write applies to. Fails when nothing is open or when
/// the desk still shows a meeting that has since closed.
pub fn check_desk_context(settings: &SystemSettings, desk_context: Option<AgendaId>) -> Result<AgendaId, AppError> {
    let Some(active) = settings.active_meeting_id else {
        return Err(AppError::Validation("No meeting is accepting check-ins".into()));
    };
    if desk_context != Some(active) {
        return Err(AppError::Validation(
            "Check-in for this meeting has closed; reload the desk".into(),
        ));
    }
    Ok(active)
}

/// Validate a check-in against the authoritative settings and the desk's
/// cached meeting, and build the record to write.
pub fn prepare_check_in(
    settings: &SystemSettings,
    desk_context: Option<AgendaId>,
    member: Option<&Member>,
    request: CheckInRequest,
) -> Result<NewAttendance, AppError> {
    let active = check_desk_context(settings, desk_context)?;
    let member = member.ok_or_else(|| AppError::Validation(format!("Unknown member {}", request.member_id)))?;

    let proxy_name = match request.kind {
        AttendanceType::Proxy => {
            let typed = request
                .proxy_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            let name = typed
                .map(String::from)
                .or_else(|| member.proxy.clone())
                .ok_or_else(|| AppError::Validation(format!("Enter the delegate's name for {}", member.unit)))?;
            Some(name)
        }
        AttendanceType::Direct | AttendanceType::Written => None,
    };

    if request.kind != AttendanceType::Written && !request.votes.is_empty() {
        return Err(AppError::Validation("Only written attendance carries ballots".into()));
    }

    Ok(NewAttendance {
        member_id: member.id,
        meeting_id: active,
        kind: request.kind,
        proxy_name,
        votes: request.votes,
    })
}

/// Front-desk surface.
///
/// Caches the meeting it is checking people in for. The cache follows
/// settings changes from the bus, and every write re-reads the settings so a
/// desk that missed a broadcast still cannot tag a closed meeting.
pub struct CheckInDesk<B: Backend> {
    backend: B,
    store: Store,
    context: Option<AgendaId>,
    changes: mpsc::UnboundedReceiver<BusMessage>,
}

impl<B: Backend> CheckInDesk<B> {
    pub async fn open(backend: B) -> Result<Self, AppError> {
        let changes = backend.subscribe(channels::DB);
        let store = Store::load(&backend).await?;
        let context = store.settings().active_meeting_id;
        log::info!("Check-in desk opened for meeting {context:?}");
        Ok(CheckInDesk { backend, store, context, changes })
    }

    pub fn context(&self) -> Option<AgendaId> {
        self.context
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Apply pending changes. Returns how many were applied.
    pub fn sync(&mut self) -> Result<usize, AppError> {
        let mut applied = 0;
        loop {
            match self.changes.try_recv() {
                Ok(msg) => {
                    if self.store.apply_message(&msg) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(AppError::Connectivity("change feed closed".into()));
                }
            }
        }
        self.follow_active_meeting();
        Ok(applied)
    }

    fn follow_active_meeting(&mut self) {
        let active = self.store.settings().active_meeting_id;
        if active != self.context {
            log::info!("Desk context moved from {:?} to {active:?}", self.context);
            self.context = active;
        }
    }

    /// Re-read the settings and return them with the meeting the desk was
    /// showing. A stale context is corrected for the next attempt but still
    /// fails this one.
    async fn refresh_context(&mut self) -> Result<(SystemSettings, Option<AgendaId>), AppError> {
        self.sync()?;
        let shown = self.context;
        let settings = self.backend.get_system_settings().await?;
        if settings.active_meeting_id != shown {
            self.context = settings.active_meeting_id;
        }
        Ok((settings, shown))
    }

    pub async fn check_in(&mut self, request: CheckInRequest) -> Result<AttendanceRecord, AppError> {
        let (settings, shown) = self.refresh_context().await?;
        let new = prepare_check_in(&settings, shown, self.store.member(request.member_id), request)?;
        self.store.check_in_optimistic(&self.backend, new).await
    }

    pub async fn cancel(&mut self, member_id: MemberId) -> Result<bool, AppError> {
        let (settings, shown) = self.refresh_context().await?;
        let meeting_id = check_desk_context(&settings, shown)?;
        self.store
            .cancel_check_in_optimistic(&self.backend, member_id, meeting_id)
            .await
    }

    pub fn stats(&mut self) -> MeetingStats {
        let context = self.context;
        self.store.meeting_stats(context)
    }

    /// Members whose unit or name contains `query`, with their status for the
    /// current meeting.
    pub fn search(&self, query: &str) -> Vec<MemberStatus> {
        let query = query.trim();
        self.store
            .members()
            .iter()
            .filter(|m| query.is_empty() || m.unit.contains(query) || m.name.contains(query))
            .map(|m| MemberStatus {
                member: m.clone(),
                checked_in: self.context.and_then(|meeting_id| {
                    self.store
                        .attendance()
                        .iter()
                        .find(|r| r.member_id == m.id && r.meeting_id == meeting_id)
                        .map(|r| r.kind)
                }),
            })
            .collect()
    }
}
