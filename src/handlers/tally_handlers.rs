use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::agenda::AgendaId;
use crate::surfaces::AdminConsole;
use crate::tally::VoteField;

use super::session::require_role;

/// Console toggles the browser keeps between requests.
#[derive(Deserialize)]
pub struct ConsoleFlags {
    #[serde(default = "default_auto_calc")]
    pub auto_calc: bool,
    #[serde(default)]
    pub manual_declaration: bool,
}

fn default_auto_calc() -> bool {
    true
}

impl Default for ConsoleFlags {
    fn default() -> Self {
        ConsoleFlags {
            auto_calc: true,
            manual_declaration: false,
        }
    }
}

#[derive(Deserialize)]
pub struct VoteForm {
    pub field: VoteField,
    pub value: u32,
    #[serde(flatten)]
    pub flags: ConsoleFlags,
}

#[derive(Deserialize)]
pub struct DeclarationForm {
    /// `None` leaves manual mode and regenerates the text.
    #[serde(default)]
    pub text: Option<String>,
}

async fn open_console<B: Backend>(
    backend: &web::Data<B>,
    session: &Session,
    agenda_id: AgendaId,
    flags: &ConsoleFlags,
) -> Result<AdminConsole<B>, AppError> {
    let role = require_role(session)?;
    let mut console = AdminConsole::open(backend.get_ref().clone(), role).await?;
    console.set_auto_calc(flags.auto_calc);
    if flags.manual_declaration {
        console.begin_declaration_edit(agenda_id)?;
    }
    Ok(console)
}

/// GET /api/agendas/{id}/tally
pub async fn show<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
    flags: web::Query<ConsoleFlags>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut console = open_console(&backend, &session, id, &flags).await?;
    let view = console.tally(id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "tally": view })))
}

/// POST /api/agendas/{id}/votes
pub async fn edit_vote<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
    form: web::Json<VoteForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let form = form.into_inner();
    let mut console = open_console(&backend, &session, id, &form.flags).await?;
    console.edit_vote(id, form.field, form.value).await?;
    let view = console.tally(id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "tally": view })))
}

/// POST /api/agendas/{id}/seed-written
pub async fn seed_written<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
    form: web::Json<ConsoleFlags>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut console = open_console(&backend, &session, id, &form).await?;
    console.seed_written_ballots(id).await?;
    let view = console.tally(id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "tally": view })))
}

/// POST /api/agendas/{id}/declaration
pub async fn declaration<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
    form: web::Json<DeclarationForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let flags = ConsoleFlags::default();
    let mut console = open_console(&backend, &session, id, &flags).await?;
    match form.into_inner().text {
        Some(text) => {
            console.begin_declaration_edit(id)?;
            console.set_declaration(id, text).await?;
        }
        None => console.end_declaration_edit(id).await?,
    }
    let view = console.tally(id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "tally": view })))
}

/// POST /api/agendas/{id}/confirm
pub async fn confirm<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut console = open_console(&backend, &session, id, &ConsoleFlags::default()).await?;
    let snapshot = console.confirm(id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "snapshot": snapshot })))
}

/// POST /api/agendas/{id}/reset
pub async fn reset<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<AgendaId>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut console = open_console(&backend, &session, id, &ConsoleFlags::default()).await?;
    console.reset(id).await?;
    let view = console.tally(id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "tally": view })))
}
