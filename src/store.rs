//! Typed access to the persisted key-value document.
//!
//! Every mutation is a read-modify-write closure run inside a single SQLite
//! `BEGIN IMMEDIATE` transaction while holding the database mutex, so two
//! handlers touching the same entity can never interleave between the read
//! and the write. Committed changes are announced on a broadcast channel,
//! which plays the role of the host's storage-changed event.

use crate::constants::CHANGE_CHANNEL_CAPACITY;
use crate::db::{migrations, Database};
use crate::error::{is_busy, AppError, AppResult};
use crate::models::{BlockedSites, Goals, SiteCategories, TimeLogs};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    SiteCategories,
    TimeLogs,
    BlockedSites,
    Goals,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SiteCategories => "siteCategories",
            Self::TimeLogs => "timeLogs",
            Self::BlockedSites => "blockedSites",
            Self::Goals => "goals",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "siteCategories" => Some(Self::SiteCategories),
            "timeLogs" => Some(Self::TimeLogs),
            "blockedSites" => Some(Self::BlockedSites),
            "goals" => Some(Self::Goals),
            _ => None,
        }
    }
}

/// A value stored under one key of the document.
pub trait Entity: Serialize + DeserializeOwned + Default + Clone + PartialEq + Send + 'static {
    const KEY: StorageKey;
}

impl Entity for SiteCategories {
    const KEY: StorageKey = StorageKey::SiteCategories;
}

impl Entity for TimeLogs {
    const KEY: StorageKey = StorageKey::TimeLogs;
}

impl Entity for BlockedSites {
    const KEY: StorageKey = StorageKey::BlockedSites;
}

impl Entity for Goals {
    const KEY: StorageKey = StorageKey::Goals;
}

#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<StorageKey>,
}

/// Lock the database, recovering from poisoning. Transactions roll back
/// on unwind, so the connection is never left mid-write.
fn lock_db(db: &Mutex<Database>) -> MutexGuard<'_, Database> {
    match db.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Store: database mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Lenient decoding for reads: an unreadable value reads as the default.
fn decode<E: Entity>(raw: Option<String>) -> E {
    decode_strict(raw).unwrap_or_else(|e| {
        warn!("Reading unreadable '{}' value as empty: {e}", E::KEY.as_str());
        E::default()
    })
}

/// Strict decoding for mutations: an unreadable value is an error, so the
/// stored row is never overwritten with a default.
fn decode_strict<E: Entity>(raw: Option<String>) -> AppResult<E> {
    match raw {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(E::default()),
    }
}

fn encode_if_changed<E: Entity>(before: &E, after: &E) -> AppResult<Option<String>> {
    if before == after {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(after)?))
}

impl Store {
    /// Open (or create) the database at `path` and apply migrations.
    pub fn open(path: &Path) -> AppResult<Self> {
        let db = Database::open(path)?;
        migrations::run(db.connection())?;
        Ok(Self::new(db))
    }

    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Receive the key of every committed change.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageKey> {
        self.changes.subscribe()
    }

    async fn blocking<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> AppResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock_db(&db);
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Internal(format!("storage task failed: {e}")))?
    }

    fn announce(&self, key: StorageKey) {
        // No subscribers is fine
        let _ = self.changes.send(key);
    }

    pub async fn read<E: Entity>(&self) -> AppResult<E> {
        let raw = self.blocking(|db| Ok(db.get(E::KEY.as_str())?)).await?;
        Ok(decode(raw))
    }

    /// Atomically read, mutate and write back one entity. The value is
    /// only written (and the change announced) if `f` altered it.
    pub async fn update<E, R, F>(&self, f: F) -> AppResult<R>
    where
        E: Entity,
        R: Send + 'static,
        F: FnOnce(&mut E) -> AppResult<R> + Send + 'static,
    {
        let (changed, out) = self
            .blocking(move |db| {
                db.transact(&[E::KEY.as_str()], |current| {
                    let before: E = decode_strict(current.into_iter().next().flatten())?;
                    let mut after = before.clone();
                    let out = f(&mut after)?;
                    let encoded = encode_if_changed(&before, &after)?;
                    let changed = encoded.is_some();
                    Ok::<_, AppError>((vec![encoded], (changed, out)))
                })
            })
            .await
            .inspect_err(log_storage_error::<E>)?;

        if changed {
            self.announce(E::KEY);
        }
        Ok(out)
    }

    /// Like [`Store::update`] but spanning two entities in one transaction.
    pub async fn update_pair<A, B, R, F>(&self, f: F) -> AppResult<R>
    where
        A: Entity,
        B: Entity,
        R: Send + 'static,
        F: FnOnce(&mut A, &mut B) -> AppResult<R> + Send + 'static,
    {
        let (changed_a, changed_b, out) = self
            .blocking(move |db| {
                db.transact(&[A::KEY.as_str(), B::KEY.as_str()], |current| {
                    let mut raw = current.into_iter();
                    let before_a: A = decode_strict(raw.next().flatten())?;
                    let before_b: B = decode_strict(raw.next().flatten())?;
                    let mut after_a = before_a.clone();
                    let mut after_b = before_b.clone();
                    let out = f(&mut after_a, &mut after_b)?;
                    let encoded_a = encode_if_changed(&before_a, &after_a)?;
                    let encoded_b = encode_if_changed(&before_b, &after_b)?;
                    let changed = (encoded_a.is_some(), encoded_b.is_some());
                    Ok::<_, AppError>((vec![encoded_a, encoded_b], (changed.0, changed.1, out)))
                })
            })
            .await
            .inspect_err(log_storage_error::<A>)?;

        if changed_a {
            self.announce(A::KEY);
        }
        if changed_b {
            self.announce(B::KEY);
        }
        Ok(out)
    }
}

#[cfg(test)]
impl Store {
    /// Run raw SQL against the backing database (fault injection in tests).
    pub(crate) fn execute_raw(&self, sql: &str) {
        lock_db(&self.db).connection().execute_batch(sql).unwrap();
    }
}

fn log_storage_error<E: Entity>(e: &AppError) {
    match e {
        AppError::Database(db_err) if is_busy(db_err) => {
            warn!("Storage busy while updating '{}': {e}", E::KEY.as_str());
        }
        AppError::Database(_) | AppError::Serialization(_) | AppError::Internal(_) => {
            log::error!("Failed to update '{}': {e}", E::KEY.as_str());
        }
        AppError::AlreadyExists { .. }
        | AppError::NotFound { .. }
        | AppError::InvalidInput { .. }
        | AppError::Host(_) => {}
    }
}
