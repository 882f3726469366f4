use actix_session::Session;

use crate::errors::AppError;
use crate::surfaces::SurfaceRole;

const ROLE_KEY: &str = "surface_role";

pub fn get_role(session: &Session) -> Option<SurfaceRole> {
    session
        .get::<String>(ROLE_KEY)
        .unwrap_or(None)
        .and_then(|s| SurfaceRole::parse(&s))
}

pub fn set_role(session: &Session, role: SurfaceRole) -> Result<(), AppError> {
    session.insert(ROLE_KEY, role.as_str())?;
    Ok(())
}

/// The surface this browser selected; errors if none was chosen yet.
pub fn require_role(session: &Session) -> Result<SurfaceRole, AppError> {
    get_role(session).ok_or_else(|| AppError::PermissionDenied("select a surface for this window first".into()))
}

/// Require one of `allowed`, returning the caller's role.
pub fn require_any(session: &Session, allowed: &[SurfaceRole], action: &str) -> Result<SurfaceRole, AppError> {
    let role = require_role(session)?;
    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AppError::PermissionDenied(format!("the {role} surface cannot {action}")))
    }
}
