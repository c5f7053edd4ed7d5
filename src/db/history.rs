//! Status history for tasks, goals and projects.

use crate::db::{Database, now_ms};
use crate::types::{Actor, ChangeReason, NodeKind, Status, StatusEvent};
use anyhow::Result;
use rusqlite::{Connection, Row, params};

/// Record a status snapshot for any node.
///
/// Only the new value is stored; the previous one is the prior row for the
/// same entity.
pub(crate) fn record_status_change(
    conn: &Connection,
    kind: NodeKind,
    entity_id: &str,
    status: Status,
    progress: Option<i32>,
    actor: &Actor,
    reason: ChangeReason,
) -> Result<()> {
    conn.execute(
        "INSERT INTO status_history (entity_kind, entity_id, status, progress, actor, reason, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![kind, entity_id, status, progress, &actor.id, reason, now_ms()],
    )?;
    Ok(())
}

fn parse_event_row(row: &Row) -> rusqlite::Result<StatusEvent> {
    Ok(StatusEvent {
        id: row.get("id")?,
        kind: row.get("entity_kind")?,
        entity_id: row.get("entity_id")?,
        status: row.get("status")?,
        progress: row.get("progress")?,
        actor: row.get("actor")?,
        reason: row.get("reason")?,
        timestamp: row.get("timestamp")?,
    })
}

impl Database {
    /// Status changes of one entity, oldest first.
    pub fn get_status_history(&self, kind: NodeKind, entity_id: &str) -> Result<Vec<StatusEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entity_kind, entity_id, status, progress, actor, reason, timestamp
                 FROM status_history
                 WHERE entity_kind = ?1 AND entity_id = ?2
                 ORDER BY id ASC",
            )?;

            let events = stmt
                .query_map(params![kind, entity_id], parse_event_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }

    /// Most recent status changes across all entities, newest first.
    pub fn get_recent_history(&self, limit: usize) -> Result<Vec<StatusEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entity_kind, entity_id, status, progress, actor, reason, timestamp
                 FROM status_history
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let events = stmt
                .query_map(params![limit as i64], parse_event_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(events)
        })
    }
}
