use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::agenda::AgendaId;
use crate::models::member::MemberId;
use crate::surfaces::{CheckInDesk, CheckInRequest, SurfaceRole, check_desk_context, prepare_check_in};

use super::session::require_any;

const DESK_ROLES: &[SurfaceRole] = &[SurfaceRole::Desk, SurfaceRole::Admin];

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// A check-in as the desk sends it, tagged with the meeting the desk
/// believes is open.
#[derive(Deserialize)]
pub struct CheckInForm {
    pub meeting_id: Option<AgendaId>,
    #[serde(flatten)]
    pub request: CheckInRequest,
}

#[derive(Deserialize)]
pub struct CancelForm {
    pub meeting_id: AgendaId,
    pub member_id: MemberId,
}

/// GET /api/desk?q=
pub async fn overview<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, DESK_ROLES, "use the check-in desk")?;
    let mut desk = CheckInDesk::open(backend.get_ref().clone()).await?;
    let stats = desk.stats();
    let members = desk.search(&query.q);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "meeting_id": desk.context(),
        "total_members": desk.store().total_members(),
        "stats": stats,
        "members": members,
    })))
}

/// POST /api/desk/check-in
pub async fn check_in<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    form: web::Json<CheckInForm>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, DESK_ROLES, "check members in")?;
    let form = form.into_inner();
    let settings = backend.get_system_settings().await?;
    let members = backend.list_members().await?;
    let member = members.iter().find(|m| m.id == form.request.member_id);
    let new = prepare_check_in(&settings, form.meeting_id, member, form.request)?;
    let record = backend.upsert_attendance(new).await?;
    log::info!(
        "Member {} checked in to meeting {} as {}",
        record.member_id,
        record.meeting_id,
        record.kind.as_str()
    );
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "record": record })))
}

/// POST /api/desk/cancel
pub async fn cancel<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    form: web::Json<CancelForm>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, DESK_ROLES, "cancel check-ins")?;
    let settings = backend.get_system_settings().await?;
    let meeting_id = check_desk_context(&settings, Some(form.meeting_id))?;
    if !backend.delete_attendance(form.member_id, meeting_id).await? {
        return Err(AppError::NotFound);
    }
    log::info!("Check-in of member {} for meeting {meeting_id} cancelled", form.member_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}
