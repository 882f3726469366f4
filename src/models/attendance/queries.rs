use sqlx::PgPool;
use sqlx::types::Json;

use crate::models::agenda::AgendaId;
use crate::models::member::MemberId;

use super::types::*;

const SELECT_COLUMNS: &str =
    "SELECT member_id, meeting_id, kind, proxy_name, votes, checked_in_at FROM attendance";

fn into_records(rows: Vec<AttendanceRow>) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    rows.into_iter().map(AttendanceRecord::try_from).collect()
}

/// All check-ins, optionally restricted to one meeting, oldest first.
pub async fn find_all(
    pool: &PgPool,
    meeting_id: Option<AgendaId>,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let rows = match meeting_id {
        Some(id) => {
            let sql = format!("{SELECT_COLUMNS} WHERE meeting_id = $1 ORDER BY checked_in_at, member_id");
            sqlx::query_as::<_, AttendanceRow>(&sql)
                .bind(id)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!("{SELECT_COLUMNS} ORDER BY checked_in_at, member_id");
            sqlx::query_as::<_, AttendanceRow>(&sql).fetch_all(pool).await?
        }
    };
    into_records(rows)
}

/// Insert or replace the check-in for `(member_id, meeting_id)`.
///
/// The unique key on the pair is what keeps one record per member per meeting
/// when several desks write at once.
pub async fn upsert(pool: &PgPool, new: &NewAttendance) -> Result<AttendanceRecord, sqlx::Error> {
    let row = sqlx::query_as::<_, AttendanceRow>(
        "INSERT INTO attendance (member_id, meeting_id, kind, proxy_name, votes) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (member_id, meeting_id) DO UPDATE \
         SET kind = EXCLUDED.kind, proxy_name = EXCLUDED.proxy_name, votes = EXCLUDED.votes \
         RETURNING member_id, meeting_id, kind, proxy_name, votes, checked_in_at",
    )
    .bind(new.member_id)
    .bind(new.meeting_id)
    .bind(new.kind.as_str())
    .bind(&new.proxy_name)
    .bind(Json(&new.votes))
    .fetch_one(pool)
    .await?;
    AttendanceRecord::try_from(row)
}

/// Remove a check-in. Returns whether a row was deleted.
pub async fn delete(pool: &PgPool, member_id: MemberId, meeting_id: AgendaId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM attendance WHERE member_id = $1 AND meeting_id = $2")
        .bind(member_id)
        .bind(meeting_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
