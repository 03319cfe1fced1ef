//! Batched event writes against SQLite.
//!
//! [`SqliteEventStore`] implements the storage side of the write path. Each
//! event in a batch is classified in order, inside one IMMEDIATE transaction:
//!
//! 1. an event whose id is already stored is a `Duplicate`;
//! 2. an event the author previously deleted is `Deleted`;
//! 3. a replaceable event older than the stored one for the same key is
//!    `Replaced`, otherwise it evicts the stored one;
//! 4. a deletion request (kind 5) records markers for its `e` tags and
//!    removes matching events by the same author;
//! 5. anything else is `Written`.
//!
//! Because the checks read through the open transaction, an event repeated
//! later in the same batch sees the earlier copy and becomes a `Duplicate`.

use crate::error::DbError;
use crate::pool::DbPool;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use relay_types::{EventStore, PreparedEvent, StoreError, WriteStatus, WriteTxn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use nostr::Kind;
use serde_json::Value;

/// The storage engine's dedicated writer connection.
pub struct SqliteEventStore {
    conn: PooledConnection<SqliteConnectionManager>,
}

impl SqliteEventStore {
    /// Wraps a pooled connection that will be used for every write.
    pub fn new(conn: PooledConnection<SqliteConnectionManager>) -> Self {
        Self { conn }
    }

    /// Checks a connection out of `pool` for exclusive use by the writer.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Pool` if no connection can be obtained.
    pub fn from_pool(pool: &DbPool) -> Result<Self, DbError> {
        Ok(Self::new(pool.get()?))
    }
}

impl EventStore for SqliteEventStore {
    type Txn<'a>
        = SqliteWriteTxn<'a>
    where
        Self: 'a;

    fn txn_rw(&mut self) -> Result<SqliteWriteTxn<'_>, StoreError> {
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)
            .map_err(|e| StoreError::Begin(e.to_string()))?;
        Ok(SqliteWriteTxn { tx })
    }
}

/// An open IMMEDIATE transaction on the writer connection.
///
/// Dropping it without committing rolls back every write made through it.
pub struct SqliteWriteTxn<'a> {
    tx: Transaction<'a>,
}

impl WriteTxn for SqliteWriteTxn<'_> {
    fn write_events(&mut self, events: &mut [PreparedEvent]) -> Result<(), StoreError> {
        for event in events.iter_mut() {
            write_event(&self.tx, event).map_err(|e| StoreError::Write(e.to_string()))?;
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .map_err(|e| StoreError::Commit(e.to_string()))
    }
}

/// Maps a stored kind onto the nostr kind table. Kinds beyond `u16` are
/// never replaceable.
fn nostr_kind(kind: u64) -> Option<Kind> {
    u16::try_from(kind).ok().map(Kind::from)
}

/// The replacement key of an event: the `d` tag value for addressable
/// kinds, empty for plain replaceable kinds, `None` for everything else.
fn replacement_key(kind: Option<Kind>, doc: &Value) -> Option<String> {
    let kind = kind?;
    if kind.is_addressable() {
        Some(first_tag_value(doc, "d").unwrap_or("").to_string())
    } else if kind.is_replaceable() {
        Some(String::new())
    } else {
        None
    }
}

/// Returns the first value of the first tag named `name`.
fn first_tag_value<'v>(doc: &'v Value, name: &str) -> Option<&'v str> {
    doc["tags"].as_array()?.iter().find_map(|tag| {
        let tag = tag.as_array()?;
        if tag.first()?.as_str()? == name {
            tag.get(1)?.as_str()
        } else {
            None
        }
    })
}

/// Collects the 32-byte ids referenced by `e` tags. Malformed ids are skipped.
fn referenced_ids(doc: &Value) -> Vec<[u8; 32]> {
    let Some(tags) = doc["tags"].as_array() else {
        return Vec::new();
    };
    tags.iter()
        .filter_map(|tag| {
            let tag = tag.as_array()?;
            if tag.first()?.as_str()? != "e" {
                return None;
            }
            let mut id = [0u8; 32];
            hex::decode_to_slice(tag.get(1)?.as_str()?, &mut id).ok()?;
            Some(id)
        })
        .collect()
}

fn write_event(conn: &Connection, event: &mut PreparedEvent) -> Result<(), DbError> {
    let packed = &event.packed;
    let id = packed.id();
    let pubkey = packed.pubkey();
    let kind = packed.kind();
    let created_at = packed.created_at();

    let exists = conn
        .query_row("SELECT 1 FROM events WHERE id = ?1", [id], |_| Ok(()))
        .optional()?
        .is_some();
    if exists {
        event.status = Some(WriteStatus::Duplicate);
        return Ok(());
    }

    let deleted = conn
        .query_row(
            "SELECT 1 FROM deletions WHERE event_id = ?1 AND pubkey = ?2",
            [id, pubkey],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if deleted {
        event.status = Some(WriteStatus::Deleted);
        return Ok(());
    }

    let doc: Value = serde_json::from_str(&event.json)?;

    let nostr_kind = nostr_kind(kind);
    let d_tag = replacement_key(nostr_kind, &doc);

    if let Some(d_tag) = &d_tag {
        let stored: Option<(i64, Vec<u8>, u64)> = conn
            .query_row(
                "SELECT lev_id, id, created_at FROM events
                 WHERE pubkey = ?1 AND kind = ?2 AND d_tag = ?3
                 ORDER BY created_at DESC, id ASC
                 LIMIT 1",
                params![pubkey, kind as i64, d_tag],
                |row| Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as u64)),
            )
            .optional()?;

        if let Some((stored_lev_id, stored_id, stored_created_at)) = stored {
            let stored_wins = stored_created_at > created_at
                || (stored_created_at == created_at && stored_id.as_slice() < id);
            if stored_wins {
                event.status = Some(WriteStatus::Replaced);
                return Ok(());
            }
            conn.execute("DELETE FROM events WHERE lev_id = ?1", [stored_lev_id])?;
            tracing::debug!(
                event_id = %packed.id_hex(),
                replaced_lev_id = stored_lev_id,
                "evicted older replaceable event"
            );
        }
    }

    if nostr_kind == Some(Kind::EventDeletion) {
        for target in referenced_ids(&doc) {
            conn.execute(
                "INSERT OR IGNORE INTO deletions (event_id, pubkey, deleted_by) VALUES (?1, ?2, ?3)",
                params![target.as_slice(), pubkey, id],
            )?;
            conn.execute(
                "DELETE FROM events WHERE id = ?1 AND pubkey = ?2",
                params![target.as_slice(), pubkey],
            )?;
        }
    }

    conn.execute(
        "INSERT INTO events
            (id, pubkey, created_at, kind, d_tag, received_at, source_type, source_addr, packed, json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id,
            pubkey,
            created_at as i64,
            kind as i64,
            d_tag,
            event.received_at as i64,
            event.source.as_str(),
            event.source_addr,
            packed.as_bytes(),
            event.json,
        ],
    )?;

    event.lev_id = Some(conn.last_insert_rowid() as u64);
    event.status = Some(WriteStatus::Written);
    Ok(())
}

/// Returns the number of stored events.
///
/// # Errors
///
/// Returns `DbError::Database` on SQL failure.
pub fn count_events(conn: &Connection) -> Result<i64, DbError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
}

/// Fetches the stored JSON of an event by its raw content id.
///
/// # Errors
///
/// Returns `DbError::Database` on SQL failure.
pub fn get_event_json(conn: &Connection, id: &[u8]) -> Result<Option<String>, DbError> {
    Ok(conn
        .query_row("SELECT json FROM events WHERE id = ?1", [id], |row| row.get(0))
        .optional()?)
}
