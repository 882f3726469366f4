use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use std::time::Instant;

use crate::backend::Backend;
use crate::bus::channels;
use crate::errors::AppError;
use crate::models::agenda::AgendaId;
use crate::models::settings::ProjectorMode;
use crate::surfaces::{AdminConsole, Store, SurfaceRole, derive_screen};

use super::session::require_role;

#[derive(Deserialize)]
pub struct ModeForm {
    pub mode: ProjectorMode,
    #[serde(default)]
    pub agenda_id: Option<AgendaId>,
    #[serde(default)]
    pub page: Option<u32>,
}

fn require_agenda(form: &ModeForm) -> Result<AgendaId, AppError> {
    form.agenda_id
        .ok_or_else(|| AppError::Validation(format!("{} needs an agenda", form.mode.as_str())))
}

/// POST /api/projector/mode
pub async fn set_mode<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    form: web::Json<ModeForm>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&session)?;
    let form = form.into_inner();
    let mut console = AdminConsole::open(backend.get_ref().clone(), role).await?;
    let now = Instant::now();
    let load = match form.mode {
        ProjectorMode::Idle => {
            console.go_idle(now).await?;
            None
        }
        ProjectorMode::Ppt => console.show_slide(require_agenda(&form)?, form.page, now).await?,
        ProjectorMode::Waiting => {
            console.show_waiting(require_agenda(&form)?, now).await?;
            None
        }
        ProjectorMode::Result => {
            console.publish_result(require_agenda(&form)?, now).await?;
            None
        }
        ProjectorMode::Adjusting => {
            console.begin_adjustment(require_agenda(&form)?, now).await?;
            None
        }
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "settings": console.settings(),
        "preview": load,
    })))
}

/// POST /api/projector/close
pub async fn close<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    let role = require_role(&session)?;
    let mut console = AdminConsole::open(backend.get_ref().clone(), role).await?;
    let delivered = console.close_projector(Instant::now()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "delivered": delivered })))
}

/// GET /api/projector/screen - what the audience should currently see.
pub async fn screen<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    require_role(&session)?;
    let store = Store::load(backend.get_ref()).await?;
    let screen = derive_screen(store.settings(), store.agendas(), store.attendance(), store.total_members());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "screen": screen })))
}

/// GET /api/projector/status
pub async fn status<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    require_role(&session)?;
    let presence = backend.bus().presence().members(channels::PROJECTOR, Instant::now());
    let connected = presence.iter().any(|p| p.role == SurfaceRole::Projector.as_str());
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "connected": connected,
        "listeners": presence.len(),
    })))
}
