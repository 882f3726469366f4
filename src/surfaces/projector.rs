use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::backend::Backend;
use crate::bus::{BusMessage, channels, events, generate_presence_key};
use crate::errors::AppError;
use crate::models::agenda::{Agenda, AgendaId, ItemKind};
use crate::models::attendance::AttendanceRecord;
use crate::models::settings::{ProjectorMode, SystemSettings};
use crate::presentation::{DoubleBuffer, LoadPage, Slot, resolve_presentation};
use crate::tally::{
    EffectiveTally, QuorumStatus, compute_meeting_stats, compute_quorum, effective_tally, percent,
    resolve_meeting_context, threshold_phrase,
};

use super::SurfaceRole;
use super::store::Store;

/// IDLE and ADJUSTING show nothing, so they may be set with no projector present.
fn needs_viewer(mode: ProjectorMode) -> bool {
    matches!(mode, ProjectorMode::Ppt | ProjectorMode::Waiting | ProjectorMode::Result)
}

/// Check whether `role` may switch the projector from `current` to `target`.
///
/// Permission is checked before connectivity so a commission console never
/// sees "not connected" for a mode it could not select anyway.
pub fn authorize_mode_change(
    role: SurfaceRole,
    current: ProjectorMode,
    target: ProjectorMode,
    projector_connected: bool,
) -> Result<(), AppError> {
    match role {
        SurfaceRole::Admin => {}
        SurfaceRole::Commission => {
            if target != ProjectorMode::Result {
                return Err(AppError::PermissionDenied(format!(
                    "the commission console can only publish results, not switch to {}",
                    target.as_str()
                )));
            }
        }
        SurfaceRole::Desk | SurfaceRole::Projector => {
            return Err(AppError::PermissionDenied(format!("the {role} surface cannot control the projector")));
        }
    }
    if !projector_connected && needs_viewer(target) {
        return Err(AppError::NotConnected);
    }
    if current == ProjectorMode::Adjusting && target != ProjectorMode::Result {
        return Err(AppError::Validation(
            "Results are being adjusted; publish them again to leave this screen".into(),
        ));
    }
    Ok(())
}

/// Everything the result screen shows for one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultBoard {
    pub agenda_id: AgendaId,
    pub title: String,
    pub kind: ItemKind,
    pub threshold: &'static str,
    pub total_members: u32,
    /// Attendance as a share of the roster.
    pub attendance_percent: u32,
    pub quorum: QuorumStatus,
    pub tally: EffectiveTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "screen", rename_all = "lowercase")]
pub enum ProjectorScreen {
    Idle,
    Slide { url: String, page: u32 },
    Waiting { agenda_id: AgendaId, title: String },
    Adjusting,
    Result(ResultBoard),
}

/// What the audience sees for the given shared state.
///
/// Unknown agendas or missing decks fall back to the idle screen.
pub fn derive_screen(
    settings: &SystemSettings,
    agendas: &[Agenda],
    attendance: &[AttendanceRecord],
    total_members: u32,
) -> ProjectorScreen {
    let data = &settings.projector_data;
    let agenda = data.agenda_id.and_then(|id| agendas.iter().find(|a| a.id() == id));
    match settings.projector_mode {
        ProjectorMode::Idle => ProjectorScreen::Idle,
        ProjectorMode::Adjusting => ProjectorScreen::Adjusting,
        ProjectorMode::Ppt => {
            let Some(agenda) = agenda else {
                return ProjectorScreen::Idle;
            };
            match resolve_presentation(agendas, agenda.id()) {
                Some(target) => ProjectorScreen::Slide {
                    url: target.url,
                    page: data.page.unwrap_or(target.page).max(1),
                },
                None => ProjectorScreen::Idle,
            }
        }
        ProjectorMode::Waiting => match agenda {
            Some(a) => ProjectorScreen::Waiting { agenda_id: a.id(), title: a.title().to_string() },
            None => ProjectorScreen::Idle,
        },
        ProjectorMode::Result => {
            let Some(item) = agenda.and_then(Agenda::as_item) else {
                return ProjectorScreen::Idle;
            };
            let meeting_id = item.meeting_id.or_else(|| resolve_meeting_context(agendas, item.id));
            let live = compute_meeting_stats(meeting_id, attendance);
            let tally = effective_tally(item, live);
            ProjectorScreen::Result(ResultBoard {
                agenda_id: item.id,
                title: item.title.clone(),
                kind: item.kind,
                threshold: threshold_phrase(item.kind),
                total_members,
                attendance_percent: percent(tally.stats.total, total_members),
                quorum: compute_quorum(total_members, &tally.stats, item.kind),
                tally,
            })
        }
    }
}

/// Audience display. Read-only with respect to shared state; it only
/// announces its presence and renders what the settings say.
pub struct ProjectorSurface<B: Backend> {
    backend: B,
    store: Store,
    db_changes: mpsc::UnboundedReceiver<BusMessage>,
    control: mpsc::UnboundedReceiver<BusMessage>,
    slides: DoubleBuffer,
    deck: Option<String>,
    presence_key: String,
    closed: bool,
}

impl<B: Backend> ProjectorSurface<B> {
    pub async fn connect(backend: B, now: Instant) -> Result<Self, AppError> {
        let db_changes = backend.subscribe(channels::DB);
        let control = backend.subscribe(channels::PROJECTOR);
        let store = Store::load(&backend).await?;
        let presence_key = generate_presence_key();
        backend
            .bus()
            .presence()
            .join(channels::PROJECTOR, &presence_key, SurfaceRole::Projector.as_str(), now);
        log::info!("Projector {presence_key} connected");
        Ok(ProjectorSurface {
            backend,
            store,
            db_changes,
            control,
            slides: DoubleBuffer::new(),
            deck: None,
            presence_key,
            closed: false,
        })
    }

    pub fn heartbeat(&self, now: Instant) {
        self.backend
            .bus()
            .presence()
            .heartbeat(channels::PROJECTOR, &self.presence_key, now);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn screen(&self) -> ProjectorScreen {
        derive_screen(
            self.store.settings(),
            self.store.agendas(),
            self.store.attendance(),
            self.store.total_members(),
        )
    }

    pub fn slides(&self) -> &DoubleBuffer {
        &self.slides
    }

    /// Document currently loaded into the slide buffer.
    pub fn deck(&self) -> Option<&str> {
        self.deck.as_deref()
    }

    /// Apply pending changes and control commands, then drive the slide
    /// buffer. Returns a page to render, if any.
    pub fn sync(&mut self, now: Instant) -> Option<LoadPage> {
        while let Ok(msg) = self.db_changes.try_recv() {
            self.store.apply_message(&msg);
        }
        loop {
            match self.control.try_recv() {
                Ok(msg) if msg.event == events::CLOSE_PROJECTOR => {
                    log::info!("Projector {} closed by remote command", self.presence_key);
                    self.close();
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if self.closed {
            return None;
        }
        match self.screen() {
            ProjectorScreen::Slide { url, page } => {
                if self.deck.as_deref() != Some(url.as_str()) {
                    // New document: page numbers in the old slots mean nothing.
                    self.slides = DoubleBuffer::new();
                    self.deck = Some(url);
                }
                self.slides
                    .request(page, now)
                    .or_else(|| self.slides.poll_timeout(now))
            }
            _ => self.slides.poll_timeout(now),
        }
    }

    pub fn on_page_rendered(&mut self, slot: Slot, page: u32, now: Instant) -> Option<LoadPage> {
        self.slides.on_rendered(slot, page, now)
    }

    pub fn on_page_error(&mut self, slot: Slot, now: Instant) -> Option<LoadPage> {
        self.slides.on_error(slot, now)
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.backend.bus().presence().leave(channels::PROJECTOR, &self.presence_key);
        }
    }
}

impl<B: Backend> Drop for ProjectorSurface<B> {
    fn drop(&mut self) {
        self.close();
    }
}
