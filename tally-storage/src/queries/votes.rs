//! Vote row queries, parameterized by a [`TableLayout`].
//!
//! `IN (…)` lists and multi-row inserts are chunked so no statement binds
//! more than `max_params` parameters.

use rusqlite::{params, params_from_iter, Connection};
use tally_core::constants::VOTE_ROW_COLUMNS;
use tally_core::errors::StorageError;
use tally_core::models::{Actor, ActorSet, Direction, Key, VoteMap, VoteToken};

use super::placeholders;
use crate::diff::{VoteDiff, VoteRow};
use crate::layout::TableLayout;
use crate::to_storage_err;

type RawRow = (Key, Actor, i64);

/// Fold raw rows into actor sets. Rows with value 0 carry no vote and
/// are skipped.
fn collect_rows(rows: Vec<RawRow>) -> Result<VoteMap, StorageError> {
    let mut map = VoteMap::default();
    for (key, actor, value) in rows {
        if value == 0 {
            continue;
        }
        if actor <= 0 {
            return Err(StorageError::corruption(format!(
                "invalid actor {actor} stored for key {key}"
            )));
        }
        let direction = Direction::from_value(value)?;
        map.entry(key)
            .or_default()
            .set(VoteToken::new(actor, direction));
    }
    Ok(map)
}

fn query_rows<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<RawRow>, StorageError> {
    let mut stmt = conn.prepare_cached(sql).map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params, |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}

pub fn select_key(conn: &Connection, layout: &TableLayout, key: Key) -> Result<ActorSet, StorageError> {
    let sql = format!(
        "SELECT {k}, {a}, {v} FROM {t} WHERE {k} = ?1",
        k = layout.key_column(),
        a = layout.actor_column(),
        v = layout.value_column(),
        t = layout.table(),
    );
    let rows = query_rows(conn, &sql, params![key])?;
    Ok(collect_rows(rows)?.remove(&key).unwrap_or_default())
}

/// Keys without rows are absent from the result.
pub fn select_keys(
    conn: &Connection,
    layout: &TableLayout,
    keys: &[Key],
    max_params: usize,
) -> Result<VoteMap, StorageError> {
    let mut rows = Vec::new();
    for chunk in keys.chunks(max_params.max(1)) {
        let sql = format!(
            "SELECT {k}, {a}, {v} FROM {t} WHERE {k} IN ({p})",
            k = layout.key_column(),
            a = layout.actor_column(),
            v = layout.value_column(),
            t = layout.table(),
            p = placeholders(chunk.len()),
        );
        rows.extend(query_rows(conn, &sql, params_from_iter(chunk))?);
    }
    collect_rows(rows)
}

pub fn select_all(conn: &Connection, layout: &TableLayout) -> Result<VoteMap, StorageError> {
    let sql = format!(
        "SELECT {k}, {a}, {v} FROM {t}",
        k = layout.key_column(),
        a = layout.actor_column(),
        v = layout.value_column(),
        t = layout.table(),
    );
    collect_rows(query_rows(conn, &sql, [])?)
}

/// Multi-row plain INSERT. An existing `(key, actor)` row is a constraint
/// violation, which surfaces as a `Query` error.
pub fn insert_rows(
    conn: &Connection,
    layout: &TableLayout,
    rows: &[VoteRow],
    max_params: usize,
) -> Result<(), StorageError> {
    let rows_per_statement = (max_params / VOTE_ROW_COLUMNS).max(1);
    for chunk in rows.chunks(rows_per_statement) {
        let values = vec!["(?,?,?)"; chunk.len()].join(",");
        let sql = format!(
            "INSERT INTO {t} ({k}, {a}, {v}) VALUES {values}",
            t = layout.table(),
            k = layout.key_column(),
            a = layout.actor_column(),
            v = layout.value_column(),
        );
        let params = chunk
            .iter()
            .flat_map(|row| [row.key, row.actor, row.direction.value()]);
        let mut stmt = conn.prepare_cached(&sql).map_err(to_storage_err)?;
        stmt.execute(params_from_iter(params)).map_err(to_storage_err)?;
    }
    Ok(())
}

/// Set the direction of an existing row. Returns the number of rows changed.
pub fn update_row(conn: &Connection, layout: &TableLayout, row: &VoteRow) -> Result<usize, StorageError> {
    let sql = format!(
        "UPDATE {t} SET {v} = ?1 WHERE {k} = ?2 AND {a} = ?3",
        t = layout.table(),
        v = layout.value_column(),
        k = layout.key_column(),
        a = layout.actor_column(),
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(to_storage_err)?;
    stmt.execute(params![row.direction.value(), row.key, row.actor])
        .map_err(to_storage_err)
}

/// Remove the rows of `actors` for one key.
pub fn delete_actors(
    conn: &Connection,
    layout: &TableLayout,
    key: Key,
    actors: &[Actor],
    max_params: usize,
) -> Result<usize, StorageError> {
    let mut deleted = 0;
    for chunk in actors.chunks(max_params.saturating_sub(1).max(1)) {
        let sql = format!(
            "DELETE FROM {t} WHERE {k} = ? AND {a} IN ({p})",
            t = layout.table(),
            k = layout.key_column(),
            a = layout.actor_column(),
            p = placeholders(chunk.len()),
        );
        let params = std::iter::once(key).chain(chunk.iter().copied());
        let mut stmt = conn.prepare_cached(&sql).map_err(to_storage_err)?;
        deleted += stmt.execute(params_from_iter(params)).map_err(to_storage_err)?;
    }
    Ok(deleted)
}

/// Update the row if it exists, insert it otherwise.
pub fn upsert_row(conn: &Connection, layout: &TableLayout, row: &VoteRow) -> Result<(), StorageError> {
    if update_row(conn, layout, row)? == 0 {
        insert_rows(conn, layout, std::slice::from_ref(row), VOTE_ROW_COLUMNS)?;
    }
    Ok(())
}

/// Apply a diff: batched inserts, per-row updates, one delete per key.
pub fn write_diff(
    conn: &Connection,
    layout: &TableLayout,
    diff: &VoteDiff,
    max_params: usize,
) -> Result<(), StorageError> {
    insert_rows(conn, layout, &diff.added, max_params)?;
    for row in &diff.modified {
        if update_row(conn, layout, row)? == 0 {
            return Err(StorageError::query(format!(
                "vote row missing for update: key {} actor {}",
                row.key, row.actor
            )));
        }
    }
    for (&key, actors) in &diff.deleted {
        let actors: Vec<Actor> = actors.iter().copied().collect();
        delete_actors(conn, layout, key, &actors, max_params)?;
    }
    Ok(())
}
