use sqlx::PgPool;

use super::types::*;

/// All members, ordered by unit label then id.
pub async fn find_all(pool: &PgPool) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "SELECT id, unit, name, proxy FROM members ORDER BY unit, id",
    )
    .fetch_all(pool)
    .await
}

/// Insert a batch of roster rows in one transaction. Returns the created members.
pub async fn insert_many(pool: &PgPool, rows: &[NewMember]) -> Result<Vec<Member>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(rows.len());
    for row in rows {
        let member = sqlx::query_as::<_, Member>(
            "INSERT INTO members (unit, name, proxy) VALUES ($1, $2, $3) \
             RETURNING id, unit, name, proxy",
        )
        .bind(&row.unit)
        .bind(&row.name)
        .bind(&row.proxy)
        .fetch_one(&mut *tx)
        .await?;
        created.push(member);
    }
    tx.commit().await?;
    Ok(created)
}

/// Set (or clear) the delegate on file. Returns the updated member, if it exists.
pub async fn update_proxy(
    pool: &PgPool,
    id: MemberId,
    proxy: Option<&str>,
) -> Result<Option<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        "UPDATE members SET proxy = $2 WHERE id = $1 RETURNING id, unit, name, proxy",
    )
    .bind(id)
    .bind(proxy)
    .fetch_optional(pool)
    .await
}
