use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::agenda::AgendaId;

use super::types::*;

/// The settings singleton lives in the row with `id = 1`, created by the migration.
pub async fn get(pool: &PgPool) -> Result<SystemSettings, sqlx::Error> {
    let row = sqlx::query_as::<_, SettingsRow>(
        "SELECT active_meeting_id, projector_mode, projector_data FROM system_settings WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(SystemSettings::from).unwrap_or_default())
}

pub async fn set_active_meeting(
    pool: &PgPool,
    meeting_id: Option<AgendaId>,
) -> Result<SystemSettings, sqlx::Error> {
    let row = sqlx::query_as::<_, SettingsRow>(
        "UPDATE system_settings SET active_meeting_id = $1 WHERE id = 1 \
         RETURNING active_meeting_id, projector_mode, projector_data",
    )
    .bind(meeting_id)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

pub async fn set_projector(
    pool: &PgPool,
    mode: ProjectorMode,
    data: &ProjectorData,
) -> Result<SystemSettings, sqlx::Error> {
    let row = sqlx::query_as::<_, SettingsRow>(
        "UPDATE system_settings SET projector_mode = $1, projector_data = $2 WHERE id = 1 \
         RETURNING active_meeting_id, projector_mode, projector_data",
    )
    .bind(mode.as_str())
    .bind(Json(data))
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}
