use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::agenda::{AgendaId, AgendaPatch, NewAgenda};
use crate::surfaces::{AdminConsole, SurfaceRole};

use super::session::{require_any, require_role};

#[derive(Deserialize)]
pub struct CreateForm {
    #[serde(flatten)]
    pub agenda: NewAgenda,
    /// Insert right after the agenda at this position; appends when absent.
    #[serde(default)]
    pub after_order_index: Option<i32>,
}

/// GET /api/agendas
pub async fn list<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    require_role(&session)?;
    let agendas = backend.list_agendas().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "agendas": agendas })))
}

/// POST /api/agendas
pub async fn create<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    form: web::Json<CreateForm>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin], "edit the agenda")?;
    let form = form.into_inner();
    if form.agenda.title().trim().is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    let agenda = backend.insert_agenda(form.agenda, form.after_order_index).await?;
    log::info!("Agenda {} '{}' created", agenda.id(), agenda.title());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "agenda": agenda })))
}

/// POST /api/agendas/{id}
///
/// Structural edits only. Counters, declarations and snapshots change
/// through the tally routes.
pub async fn update<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
    form: web::Json<AgendaPatch>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin], "edit the agenda")?;
    let patch = form.into_inner();
    if patch.votes.is_some() || patch.declaration.is_some() || patch.vote_snapshot.is_some() {
        return Err(AppError::Validation("Vote figures are edited from the tally panel".into()));
    }
    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("Title is required".into()));
    }
    if patch.is_empty() {
        return Err(AppError::Validation("Nothing to update".into()));
    }
    let agenda = backend.update_agenda(path.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "agenda": agenda })))
}

/// DELETE /api/agendas/{id}
pub async fn delete<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin], "edit the agenda")?;
    let id = path.into_inner();
    backend.delete_agenda(id).await?;
    log::info!("Agenda {id} deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

/// POST /api/meetings/{id}/activate
pub async fn activate<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
) -> Result<HttpResponse, AppError> {
    let role = require_role(&session)?;
    let mut console = AdminConsole::open(backend.get_ref().clone(), role).await?;
    let settings = console.activate_meeting(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "settings": settings })))
}

/// POST /api/meetings/deactivate
pub async fn deactivate<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    let role = require_role(&session)?;
    let mut console = AdminConsole::open(backend.get_ref().clone(), role).await?;
    let settings = console.close_check_in().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "settings": settings })))
}
