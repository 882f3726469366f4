use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::backend::Backend;
use crate::errors::AppError;
use crate::models::member::{MemberId, NewMember};
use crate::surfaces::SurfaceRole;

use super::session::{require_any, require_role};

#[derive(Deserialize)]
pub struct ImportForm {
    pub members: Vec<NewMember>,
}

#[derive(Deserialize)]
pub struct ProxyForm {
    #[serde(default)]
    pub proxy: Option<String>,
}

/// GET /api/members
pub async fn list<B: Backend>(backend: web::Data<B>, session: Session) -> Result<HttpResponse, AppError> {
    require_role(&session)?;
    let members = backend.list_members().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "members": members })))
}

/// POST /api/members/import - bulk insert from the roster spreadsheet.
pub async fn import<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    form: web::Json<ImportForm>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin], "import the roster")?;
    let form = form.into_inner();
    let mut rows = Vec::with_capacity(form.members.len());
    for (i, raw) in form.members.iter().enumerate() {
        let row = raw
            .normalized()
            .ok_or_else(|| AppError::Validation(format!("Row {} is missing a unit or name", i + 1)))?;
        rows.push(row);
    }
    let inserted = backend.import_members(rows).await?;
    log::info!("Imported {} member(s)", inserted.len());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "imported": inserted.len(), "members": inserted })))
}

/// POST /api/members/{id}/proxy
pub async fn set_proxy<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<MemberId>,
    form: web::Json<ProxyForm>,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin, SurfaceRole::Desk], "edit delegates")?;
    let proxy = form
        .into_inner()
        .proxy
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let member = backend.set_member_proxy(path.into_inner(), proxy).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "member": member })))
}
