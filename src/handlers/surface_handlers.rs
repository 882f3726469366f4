use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::errors::AppError;
use crate::surfaces::SurfaceRole;

use super::session::{get_role, set_role};

#[derive(Deserialize)]
pub struct SelectForm {
    pub role: SurfaceRole,
}

/// GET /surface - role chosen for this browser window, if any.
pub async fn current(session: Session) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "role": get_role(&session) })))
}

/// POST /surface - pick which surface this window runs as.
pub async fn select(session: Session, form: web::Json<SelectForm>) -> Result<HttpResponse, AppError> {
    set_role(&session, form.role)?;
    log::info!("Window registered as {} surface", form.role);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "role": form.role })))
}
