//! Transaction boundary around the customer repository.
//!
//! # Responsibility
//! - Run one lifecycle operation inside exactly one SQLite transaction.
//! - Commit on success; roll back on any error returned by the work closure.
//!
//! # Invariants
//! - Write operations take the database write lock up front
//!   (`BEGIN IMMEDIATE`), so check-then-write sequences never interleave.
//! - Read operations use deferred transactions and see committed state only.

use crate::db::{open_db, open_db_in_memory};
use crate::repo::customer_repo::{
    CustomerRepository, RepoError, RepoResult, SqliteCustomerRepository,
};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;

/// Transaction intent for one unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Read,
    Write,
}

/// Store capable of running repository work atomically.
pub trait CustomerStore {
    /// Runs `work` inside one transaction.
    ///
    /// The transaction commits only when `work` returns `Ok`.
    fn in_transaction<T, E, F>(&mut self, mode: TxMode, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn CustomerRepository) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed store owning a single connection.
///
/// Use one store per thread; concurrent stores on the same database file are
/// serialized by SQLite's write lock and the unique email index.
pub struct SqliteCustomerStore {
    conn: Connection,
}

impl SqliteCustomerStore {
    /// Wraps a migrated connection after verifying its schema.
    pub fn new(conn: Connection) -> RepoResult<Self> {
        SqliteCustomerRepository::try_new(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    /// Borrow of the underlying connection, for inspection outside a unit
    /// of work. Writes made through it bypass `in_transaction`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CustomerStore for SqliteCustomerStore {
    fn in_transaction<T, E, F>(&mut self, mode: TxMode, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn CustomerRepository) -> Result<T, E>,
        E: From<RepoError>,
    {
        let behavior = match mode {
            TxMode::Read => TransactionBehavior::Deferred,
            TxMode::Write => TransactionBehavior::Immediate,
        };
        let tx = self
            .conn
            .transaction_with_behavior(behavior)
            .map_err(RepoError::from)?;

        let value = {
            let repo = SqliteCustomerRepository::new_unchecked(&tx);
            work(&repo)?
        };

        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}
