// ⚖️ Reconciler - find-or-create-then-update by natural key
//
// reconcile(key, updates):
//   1. look the entity up by its natural key
//   2. not found → build a fresh entity from the key (was_created = true)
//   3. apply every present update
//   4. validate → on failure nothing is written
//   5. insert or update + audit event, in one SQLite transaction
//
// At most one row exists per natural key afterwards. The pipeline is
// single-threaded, so lookup-then-write needs no locking.

use crate::db::{insert_event, Event};
use crate::error::{ReconcileError, ValidationErrors};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt::Debug;

/// Actor recorded on audit events written by the reconciler
pub const RECONCILER_ACTOR: &str = "importer";

/// An entity that can be merged into the store by natural key.
pub trait Reconcilable: Sized + Serialize {
    /// Natural key (business identity)
    type Key: Debug;

    /// Partial attribute changes; absent fields are left untouched
    type Updates;

    /// Entity name used in audit events ("organization", "candidate", ...)
    const ENTITY_TYPE: &'static str;

    fn find(conn: &Connection, key: &Self::Key) -> Result<Option<Self>>;

    /// New, unsaved entity with the natural key populated and defaults elsewhere
    fn from_key(key: &Self::Key) -> Self;

    fn apply(&mut self, updates: &Self::Updates);

    fn validate(&self) -> Result<(), ValidationErrors>;

    /// Insert a new row and record its rowid on `self`
    fn insert(&mut self, conn: &Connection) -> Result<()>;

    fn update(&mut self, conn: &Connection) -> Result<()>;

    /// SQLite rowid (0 while unsaved)
    fn id(&self) -> i64;
}

/// Result of a successful reconciliation
#[derive(Debug, Clone)]
pub struct Reconciled<E> {
    pub entity: E,
    pub was_created: bool,
}

pub fn reconcile<E: Reconcilable>(
    conn: &Connection,
    key: &E::Key,
    updates: &E::Updates,
) -> Result<Reconciled<E>, ReconcileError> {
    let (mut entity, was_created) = match E::find(conn, key)? {
        Some(existing) => (existing, false),
        None => (E::from_key(key), true),
    };

    entity.apply(updates);
    entity.validate()?;

    // Dropped without commit → rolled back
    let tx = conn.unchecked_transaction()?;

    if was_created {
        entity.insert(&tx)?;
    } else {
        entity.update(&tx)?;
    }

    let event_type = format!(
        "{}_{}",
        E::ENTITY_TYPE,
        if was_created { "created" } else { "updated" }
    );
    let event = Event::new(
        &event_type,
        E::ENTITY_TYPE,
        &entity.id().to_string(),
        serde_json::to_value(&entity).map_err(anyhow::Error::from)?,
        RECONCILER_ACTOR,
    );
    insert_event(&tx, &event)?;

    tx.commit()?;

    Ok(Reconciled { entity, was_created })
}
