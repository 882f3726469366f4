use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::tally::assign_meeting_ids;

use super::types::*;

const SELECT_COLUMNS: &str = "SELECT id, order_index, kind, title, presentation_url, start_page, \
     meeting_id, votes_yes, votes_no, votes_abstain, declaration, vote_snapshot FROM agendas";

fn kind_column(new: &NewAgenda) -> &'static str {
    match new {
        NewAgenda::Folder { .. } => "folder",
        NewAgenda::Item { kind, .. } => kind.as_str(),
    }
}

fn to_i32(v: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(v).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

async fn load_ordered(tx: &mut Transaction<'_, Postgres>) -> Result<Vec<Agenda>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY order_index, id");
    let rows = sqlx::query_as::<_, AgendaRow>(&sql).fetch_all(&mut **tx).await?;
    rows.into_iter().map(Agenda::try_from).collect()
}

/// Recompute every item's owning folder from list order and persist the ones
/// that moved.
async fn refresh_meeting_ids(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    let mut agendas = load_ordered(tx).await?;
    let before: Vec<Option<AgendaId>> = agendas
        .iter()
        .map(|a| a.as_item().and_then(|i| i.meeting_id))
        .collect();
    assign_meeting_ids(&mut agendas);
    for (agenda, old) in agendas.iter().zip(before) {
        if let Some(item) = agenda.as_item() {
            if item.meeting_id != old {
                sqlx::query("UPDATE agendas SET meeting_id = $2 WHERE id = $1")
                    .bind(item.id)
                    .bind(item.meeting_id)
                    .execute(&mut **tx)
                    .await?;
            }
        }
    }
    Ok(())
}

/// All agendas in list order.
pub async fn find_all(pool: &PgPool) -> Result<Vec<Agenda>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY order_index, id");
    let rows = sqlx::query_as::<_, AgendaRow>(&sql).fetch_all(pool).await?;
    rows.into_iter().map(Agenda::try_from).collect()
}

pub async fn find_by_id(pool: &PgPool, id: AgendaId) -> Result<Option<Agenda>, sqlx::Error> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    let row = sqlx::query_as::<_, AgendaRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Agenda::try_from).transpose()
}

/// Insert an agenda directly after `after_order_index`, or at the end of the list.
///
/// Later rows are shifted down by one and item ownership is recomputed in
/// the same transaction.
pub async fn insert(
    pool: &PgPool,
    new: &NewAgenda,
    after_order_index: Option<i32>,
) -> Result<Agenda, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let order_index = match after_order_index {
        Some(after) => {
            sqlx::query("UPDATE agendas SET order_index = order_index + 1 WHERE order_index > $1")
                .bind(after)
                .execute(&mut *tx)
                .await?;
            after + 1
        }
        None => {
            let max: Option<i32> = sqlx::query_scalar("SELECT MAX(order_index) FROM agendas")
                .fetch_one(&mut *tx)
                .await?;
            max.map_or(0, |m| m + 1)
        }
    };

    let (presentation_url, start_page) = match new {
        NewAgenda::Folder { presentation_url, .. } => (presentation_url.clone(), None),
        NewAgenda::Item { presentation_url, start_page, .. } => {
            (presentation_url.clone(), start_page.map(to_i32).transpose()?)
        }
    };

    let id: AgendaId = sqlx::query_scalar(
        "INSERT INTO agendas (order_index, kind, title, presentation_url, start_page) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(order_index)
    .bind(kind_column(new))
    .bind(new.title())
    .bind(presentation_url)
    .bind(start_page)
    .fetch_one(&mut *tx)
    .await?;

    refresh_meeting_ids(&mut tx).await?;

    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    let row = sqlx::query_as::<_, AgendaRow>(&sql)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Agenda::try_from(row)
}

/// Write only the fields present in `patch`. Returns `None` if the agenda
/// does not exist.
pub async fn update(
    pool: &PgPool,
    id: AgendaId,
    patch: &AgendaPatch,
) -> Result<Option<Agenda>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if !patch.is_empty() {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE agendas SET ");
        let mut set = qb.separated(", ");
        if let Some(title) = &patch.title {
            set.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(order_index) = patch.order_index {
            set.push("order_index = ").push_bind_unseparated(order_index);
        }
        if let Some(url) = &patch.presentation_url {
            set.push("presentation_url = ").push_bind_unseparated(url.clone());
        }
        if let Some(kind) = patch.kind {
            set.push("kind = ").push_bind_unseparated(kind.as_str());
        }
        if let Some(page) = patch.start_page {
            set.push("start_page = ").push_bind_unseparated(page.map(to_i32).transpose()?);
        }
        if let Some(votes) = patch.votes {
            set.push("votes_yes = ").push_bind_unseparated(to_i32(votes.yes)?);
            set.push("votes_no = ").push_bind_unseparated(to_i32(votes.no)?);
            set.push("votes_abstain = ").push_bind_unseparated(to_i32(votes.abstain)?);
        }
        if let Some(declaration) = &patch.declaration {
            set.push("declaration = ").push_bind_unseparated(declaration.clone());
        }
        if let Some(snapshot) = &patch.vote_snapshot {
            set.push("vote_snapshot = ")
                .push_bind_unseparated(snapshot.clone().map(Json));
        }
        qb.push(" WHERE id = ").push_bind(id);
        let result = qb.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        if patch.order_index.is_some() {
            refresh_meeting_ids(&mut tx).await?;
        }
    }

    let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
    let row = sqlx::query_as::<_, AgendaRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    tx.commit().await?;
    row.map(Agenda::try_from).transpose()
}

/// Delete an agenda and recompute item ownership. Returns whether it existed.
pub async fn delete(pool: &PgPool, id: AgendaId) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM agendas WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() > 0 {
        refresh_meeting_ids(&mut tx).await?;
    }
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
