//! Schema store and ledger boundaries.
//!
//! The runner only needs transactional DDL execution plus a persisted list
//! of applied identifiers. Each driver implements both on one connection so
//! ledger writes share the transaction of the record they describe.

mod memory;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "mysql")]
mod mysql;

pub use memory::{InMemoryStore, TransactionCounts};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresStore;

#[cfg(feature = "mysql")]
pub use self::mysql::MySqlStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";

pub trait SchemaStore {
    fn begin(&mut self) -> Result<(), StoreError>;
    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;
}

pub trait Ledger {
    /// Applied entries in ascending identifier order.
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError>;
    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError>;
    fn remove(&mut self, identifier: &str) -> Result<(), StoreError>;
}

impl<T: SchemaStore + ?Sized> SchemaStore for &mut T {
    fn begin(&mut self) -> Result<(), StoreError> {
        (**self).begin()
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        (**self).execute(sql)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        (**self).rollback()
    }
}

impl<T: Ledger + ?Sized> Ledger for &mut T {
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).entries()
    }

    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).record(identifier, applied_at)
    }

    fn remove(&mut self, identifier: &str) -> Result<(), StoreError> {
        (**self).remove(identifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub identifier: String,
    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(identifier: impl Into<String>, applied_at: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            applied_at,
        }
    }

    /// Builds an entry from the RFC 3339 text stored in ledger tables.
    pub fn parse(identifier: String, applied_at: &str) -> Result<Self, StoreError> {
        let applied_at = DateTime::parse_from_rfc3339(applied_at)
            .map_err(|source| StoreError::InvalidTimestamp {
                value: applied_at.to_string(),
                source,
            })?
            .with_timezone(&Utc);
        Ok(Self {
            identifier,
            applied_at,
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] ::postgres::Error),
    #[cfg(feature = "mysql")]
    #[error(transparent)]
    MySql(#[from] ::mysql::Error),
    #[error("invalid ledger timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("invalid ledger table name {0:?}")]
    InvalidTableName(String),
    #[error("{0}")]
    Message(String),
}

/// The ledger table name is interpolated into SQL, so only plain
/// identifiers are accepted.
pub(crate) fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}
