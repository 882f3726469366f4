use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::backend::Backend;
use crate::errors::AppError;
use crate::surfaces::SurfaceRole;

use super::session::require_any;

/// Presentation decks are the largest uploads.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// POST /api/files/{bucket}/{path}
pub async fn upload<B: Backend>(
    backend: web::Data<B>,
    session: Session,
    path: web::Path<(String, String)>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    require_any(&session, &[SurfaceRole::Admin], "upload files")?;
    let (bucket, file_path) = path.into_inner();
    if body.is_empty() {
        return Err(AppError::Validation("Empty upload".into()));
    }
    let url = backend.upload_file(&bucket, &file_path, body.to_vec()).await?;
    log::info!("Uploaded {} bytes to {bucket}/{file_path}", body.len());
    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true, "url": url })))
}
