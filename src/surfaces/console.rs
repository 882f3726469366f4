use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::backend::{Backend, Change};
use crate::bus::{BusMessage, channels, events};
use crate::errors::AppError;
use crate::models::agenda::{AgendaId, AgendaPatch, Item, ItemKind, VoteCounts, VoteSnapshot};
use crate::models::settings::{ProjectorData, ProjectorMode, SystemSettings};
use crate::presentation::{DoubleBuffer, LoadPage, Slot, resolve_presentation};
use crate::tally::{
    DeclarationDraft, EffectiveTally, MeetingStats, QuorumStatus, VoteField, compute_passage, compute_quorum,
    confirm_snapshot, edit_votes, effective_tally, generate_declaration, threshold_phrase, written_ballot_counts,
};

use super::SurfaceRole;
use super::projector::authorize_mode_change;
use super::store::Store;

/// Tally panel for one agenda item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyView {
    pub agenda_id: AgendaId,
    pub meeting_id: Option<AgendaId>,
    pub title: String,
    pub kind: ItemKind,
    pub threshold: &'static str,
    pub total_members: u32,
    pub live_stats: MeetingStats,
    pub quorum: QuorumStatus,
    pub tally: EffectiveTally,
    pub written_ballots: VoteCounts,
    pub declaration_draft: String,
    pub manual_declaration: bool,
    pub auto_calc: bool,
}

/// Admin or commission console: edits tallies, confirms results and drives
/// the projector.
pub struct AdminConsole<B: Backend> {
    backend: B,
    role: SurfaceRole,
    store: Store,
    changes: mpsc::UnboundedReceiver<BusMessage>,
    auto_calc: bool,
    drafts: HashMap<AgendaId, DeclarationDraft>,
    preview: DoubleBuffer,
}

impl<B: Backend> AdminConsole<B> {
    pub async fn open(backend: B, role: SurfaceRole) -> Result<Self, AppError> {
        if !role.can_edit_votes() {
            return Err(AppError::PermissionDenied(format!("the {role} surface cannot open the console")));
        }
        let changes = backend.subscribe(channels::DB);
        let store = Store::load(&backend).await?;
        Ok(AdminConsole {
            backend,
            role,
            store,
            changes,
            auto_calc: true,
            drafts: HashMap::new(),
            preview: DoubleBuffer::new(),
        })
    }

    pub fn role(&self) -> SurfaceRole {
        self.role
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn settings(&self) -> &SystemSettings {
        self.store.settings()
    }

    pub fn auto_calc(&self) -> bool {
        self.auto_calc
    }

    pub fn set_auto_calc(&mut self, on: bool) {
        self.auto_calc = on;
    }

    /// Apply pending row changes. Returns how many were applied.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.changes.try_recv() {
            if self.store.apply_message(&msg) {
                applied += 1;
            }
        }
        applied
    }

    fn require_admin(&self, action: &str) -> Result<(), AppError> {
        match self.role {
            SurfaceRole::Admin => Ok(()),
            role => Err(AppError::PermissionDenied(format!("the {role} console cannot {action}"))),
        }
    }

    fn item(&self, agenda_id: AgendaId) -> Result<Item, AppError> {
        match self.store.agenda(agenda_id) {
            Some(agenda) => agenda
                .as_item()
                .cloned()
                .ok_or_else(|| AppError::Validation(format!("'{}' is a meeting, not a vote", agenda.title()))),
            None => Err(AppError::NotFound),
        }
    }

    fn draft(&mut self, item: &Item) -> &mut DeclarationDraft {
        self.drafts
            .entry(item.id)
            .or_insert_with(|| DeclarationDraft::new(item.declaration.clone().unwrap_or_default()))
    }

    async fn write(&mut self, agenda_id: AgendaId, patch: AgendaPatch) -> Result<Item, AppError> {
        let updated = self.backend.update_agenda(agenda_id, patch).await?;
        self.store.put_agenda(updated.clone());
        updated
            .as_item()
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("agenda {agenda_id} is not a vote")))
    }

    // -----------------------------------------------------------------------
    // Meetings
    // -----------------------------------------------------------------------

    /// Open check-in for `meeting_id`. Any previously active meeting stops
    /// accepting check-ins at the same moment.
    pub async fn activate_meeting(&mut self, meeting_id: AgendaId) -> Result<SystemSettings, AppError> {
        self.require_admin("start a meeting")?;
        match self.store.agenda(meeting_id) {
            Some(agenda) if agenda.is_folder() => {}
            Some(agenda) => {
                return Err(AppError::Validation(format!("'{}' is an agenda item, not a meeting", agenda.title())));
            }
            None => return Err(AppError::NotFound),
        }
        let previous = self.store.settings().active_meeting_id;
        let settings = self.backend.set_active_meeting(Some(meeting_id)).await?;
        log::info!("Active meeting changed from {previous:?} to {meeting_id}");
        self.store.apply(Change::SettingsChanged { settings: settings.clone() });
        Ok(settings)
    }

    pub async fn close_check_in(&mut self) -> Result<SystemSettings, AppError> {
        self.require_admin("end a meeting")?;
        let settings = self.backend.set_active_meeting(None).await?;
        log::info!("Check-in closed");
        self.store.apply(Change::SettingsChanged { settings: settings.clone() });
        Ok(settings)
    }

    // -----------------------------------------------------------------------
    // Tallies
    // -----------------------------------------------------------------------

    pub fn tally(&mut self, agenda_id: AgendaId) -> Result<TallyView, AppError> {
        let item = self.item(agenda_id)?;
        let meeting_id = self.store.meeting_of(agenda_id);
        let live_stats = self.store.meeting_stats(meeting_id);
        let total_members = self.store.total_members();
        let tally = effective_tally(&item, live_stats);
        let written_ballots = written_ballot_counts(agenda_id, self.store.attendance());
        let auto_calc = self.auto_calc;
        let draft = self.draft(&item).clone();
        Ok(TallyView {
            agenda_id,
            meeting_id,
            title: item.title.clone(),
            kind: item.kind,
            threshold: threshold_phrase(item.kind),
            total_members,
            live_stats,
            quorum: compute_quorum(total_members, &tally.stats, item.kind),
            tally,
            written_ballots,
            declaration_draft: draft.text().to_string(),
            manual_declaration: draft.is_manual(),
            auto_calc,
        })
    }

    async fn store_votes(&mut self, item: Item, votes: VoteCounts) -> Result<Item, AppError> {
        let total = self.store.live_stats_for(item.id).total;
        let passed = compute_passage(votes.yes, total, item.kind);
        let regenerated = self
            .draft(&item)
            .on_votes_changed(&item.title, votes, total, item.kind, passed, false);
        let mut patch = AgendaPatch {
            votes: Some(votes),
            ..AgendaPatch::default()
        };
        if regenerated {
            patch.declaration = Some(Some(self.draft(&item).text().to_string()));
        }
        self.write(item.id, patch).await
    }

    /// Operator typed a new value into one of the vote counters.
    pub async fn edit_vote(&mut self, agenda_id: AgendaId, field: VoteField, value: u32) -> Result<VoteCounts, AppError> {
        let item = self.item(agenda_id)?;
        if item.is_confirmed() {
            return Err(AppError::Validation(format!(
                "'{}' is confirmed; start an adjustment before changing its numbers",
                item.title
            )));
        }
        let total = self.store.live_stats_for(agenda_id).total;
        let votes = edit_votes(field, value, total, item.votes, self.auto_calc);
        let updated = self.store_votes(item, votes).await?;
        Ok(updated.votes)
    }

    /// Load the counters from the written ballots submitted at check-in.
    pub async fn seed_written_ballots(&mut self, agenda_id: AgendaId) -> Result<VoteCounts, AppError> {
        let item = self.item(agenda_id)?;
        if item.is_confirmed() {
            return Err(AppError::Validation(format!("'{}' is already confirmed", item.title)));
        }
        let votes = written_ballot_counts(agenda_id, self.store.attendance());
        let updated = self.store_votes(item, votes).await?;
        Ok(updated.votes)
    }

    pub fn begin_declaration_edit(&mut self, agenda_id: AgendaId) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        self.draft(&item).begin_manual_edit();
        Ok(())
    }

    /// Save operator-typed declaration text. Keeps manual mode on.
    pub async fn set_declaration(&mut self, agenda_id: AgendaId, text: String) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        if item.is_confirmed() {
            return Err(AppError::Validation(format!("'{}' is confirmed; its declaration is frozen", item.title)));
        }
        self.draft(&item).set_text(text.clone());
        let patch = AgendaPatch {
            declaration: Some(Some(text)),
            ..AgendaPatch::default()
        };
        self.write(agenda_id, patch).await?;
        Ok(())
    }

    /// Leave manual mode and regenerate from the current counts.
    pub async fn end_declaration_edit(&mut self, agenda_id: AgendaId) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        self.draft(&item).end_manual_edit();
        if item.is_confirmed() {
            return Ok(());
        }
        self.store_votes(item.clone(), item.votes).await?;
        Ok(())
    }

    /// Freeze the current figures for `agenda_id`.
    pub async fn confirm(&mut self, agenda_id: AgendaId) -> Result<VoteSnapshot, AppError> {
        let mut item = self.item(agenda_id)?;
        let live = self.store.live_stats_for(agenda_id);
        let declaration = {
            let text = self.draft(&item).text().to_string();
            if text.trim().is_empty() {
                let passed = compute_passage(item.votes.yes, live.total, item.kind);
                generate_declaration(&item.title, item.votes, live.total, item.kind, passed)
            } else {
                text
            }
        };
        let votes = item.votes;
        let snapshot = confirm_snapshot(&mut item, live, votes, declaration.clone(), chrono::Utc::now())
            .map_err(AppError::Validation)?;
        let patch = AgendaPatch {
            declaration: Some(Some(declaration)),
            vote_snapshot: Some(Some(snapshot.clone())),
            ..AgendaPatch::default()
        };
        self.write(agenda_id, patch).await?;
        log::info!(
            "Confirmed '{}': {:?} with {}/{}/{} of {}",
            item.title,
            snapshot.result,
            votes.yes,
            votes.no,
            votes.abstain,
            live.total
        );
        Ok(snapshot)
    }

    /// Unfreeze `agenda_id` and go back to live figures.
    ///
    /// Refused while the result is on the projector; use
    /// [`begin_adjustment`](Self::begin_adjustment) for that.
    pub async fn reset(&mut self, agenda_id: AgendaId) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        let settings = self.store.settings();
        if settings.projector_mode == ProjectorMode::Result && settings.projector_data.agenda_id == Some(agenda_id) {
            return Err(AppError::Validation(format!(
                "'{}' is on the projector; start an adjustment instead",
                item.title
            )));
        }
        self.unfreeze(&item).await
    }

    async fn unfreeze(&mut self, item: &Item) -> Result<(), AppError> {
        if !item.is_confirmed() {
            return Ok(());
        }
        let patch = AgendaPatch {
            vote_snapshot: Some(None),
            ..AgendaPatch::default()
        };
        self.write(item.id, patch).await?;
        log::info!("Snapshot of '{}' reset to live figures", item.title);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Projector
    // -----------------------------------------------------------------------

    pub fn projector_connected(&self, now: Instant) -> bool {
        self.backend
            .bus()
            .presence()
            .is_present(channels::PROJECTOR, SurfaceRole::Projector.as_str(), now)
    }

    async fn change_mode(&mut self, target: ProjectorMode, data: ProjectorData, now: Instant) -> Result<(), AppError> {
        let current = self.store.settings().projector_mode;
        authorize_mode_change(self.role, current, target, self.projector_connected(now))?;
        let settings = self.backend.set_projector_mode(target, data).await?;
        log::info!("Projector mode {} -> {}", current.as_str(), target.as_str());
        self.store.apply(Change::SettingsChanged { settings });
        Ok(())
    }

    pub async fn go_idle(&mut self, now: Instant) -> Result<(), AppError> {
        self.change_mode(ProjectorMode::Idle, ProjectorData::default(), now).await
    }

    /// Show the deck for `agenda_id`, at `page` or the agenda's start page.
    /// Also queues the page in the console's preview buffer.
    pub async fn show_slide(
        &mut self,
        agenda_id: AgendaId,
        page: Option<u32>,
        now: Instant,
    ) -> Result<Option<LoadPage>, AppError> {
        let target = resolve_presentation(self.store.agendas(), agenda_id)
            .ok_or_else(|| AppError::Validation(format!("agenda {agenda_id} has no presentation")))?;
        let page = page.unwrap_or(target.page).max(1);
        let data = ProjectorData {
            agenda_id: Some(agenda_id),
            page: Some(page),
        };
        self.change_mode(ProjectorMode::Ppt, data, now).await?;
        Ok(self.preview.request(page, now))
    }

    pub async fn show_waiting(&mut self, agenda_id: AgendaId, now: Instant) -> Result<(), AppError> {
        if self.store.agenda(agenda_id).is_none() {
            return Err(AppError::NotFound);
        }
        let data = ProjectorData {
            agenda_id: Some(agenda_id),
            page: None,
        };
        self.change_mode(ProjectorMode::Waiting, data, now).await
    }

    /// Put the result of `agenda_id` on screen, confirming it first if needed.
    pub async fn publish_result(&mut self, agenda_id: AgendaId, now: Instant) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        let current = self.store.settings().projector_mode;
        authorize_mode_change(self.role, current, ProjectorMode::Result, self.projector_connected(now))?;
        if !item.is_confirmed() {
            self.confirm(agenda_id).await?;
        }
        let data = ProjectorData {
            agenda_id: Some(agenda_id),
            page: None,
        };
        self.change_mode(ProjectorMode::Result, data, now).await
    }

    /// Blank the result screen and unfreeze `agenda_id` so its numbers can
    /// be corrected. Only [`publish_result`](Self::publish_result) leaves
    /// this state.
    pub async fn begin_adjustment(&mut self, agenda_id: AgendaId, now: Instant) -> Result<(), AppError> {
        let item = self.item(agenda_id)?;
        let data = ProjectorData {
            agenda_id: Some(agenda_id),
            page: None,
        };
        self.change_mode(ProjectorMode::Adjusting, data, now).await?;
        self.unfreeze(&item).await
    }

    /// Ask every projector window to close and blank the shared screen.
    ///
    /// An adjustment in progress stays in ADJUSTING; only publishing leaves it.
    pub async fn close_projector(&mut self, now: Instant) -> Result<usize, AppError> {
        self.require_admin("close the projector")?;
        if !self.projector_connected(now) {
            return Err(AppError::NotConnected);
        }
        let delivered = self
            .backend
            .bus()
            .publish(channels::PROJECTOR, events::CLOSE_PROJECTOR, serde_json::json!({}));
        log::info!("Close command sent to {delivered} projector listener(s)");
        if self.store.settings().projector_mode != ProjectorMode::Adjusting {
            let settings = self
                .backend
                .set_projector_mode(ProjectorMode::Idle, ProjectorData::default())
                .await?;
            self.store.apply(Change::SettingsChanged { settings });
        }
        Ok(delivered)
    }

    pub fn preview(&self) -> &DoubleBuffer {
        &self.preview
    }

    pub fn on_preview_rendered(&mut self, slot: Slot, page: u32, now: Instant) -> Option<LoadPage> {
        self.preview.on_rendered(slot, page, now)
    }

    pub fn on_preview_error(&mut self, slot: Slot, now: Instant) -> Option<LoadPage> {
        self.preview.on_error(slot, now)
    }

    pub fn poll_preview(&mut self, now: Instant) -> Option<LoadPage> {
        self.preview.poll_timeout(now)
    }
}
