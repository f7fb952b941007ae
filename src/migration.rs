use std::collections::BTreeMap;

use thiserror::Error;

use crate::backend::Backend;
use crate::operation::{Operation, UnsupportedOperation};
use crate::store::StoreError;

/// One authored schema change: forward operations plus either an explicit
/// reverse list or the reverse derived from each forward operation.
///
/// Identifiers sort lexicographically; prefix them with a timestamp
/// (`1716372428102_create_initial_tables`) so that authoring order and
/// application order agree.
pub struct Migration {
    pub identifier: &'static str,
    up: Vec<Box<dyn Operation>>,
    down: Option<Vec<Box<dyn Operation>>>,
    atomic: bool,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("identifier", &self.identifier)
            .field("up", &format!("[{} operations]", self.up.len()))
            .field(
                "down",
                &self
                    .down
                    .as_ref()
                    .map(|ops| format!("[{} operations]", ops.len())),
            )
            .field("atomic", &self.atomic)
            .finish()
    }
}

impl Migration {
    pub fn new(identifier: &'static str) -> Self {
        Self {
            identifier,
            up: Vec::new(),
            down: None,
            atomic: true,
        }
    }

    /// Run this record inside a store transaction (default). Ignored by
    /// dialects without transactional DDL.
    pub fn atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Append a forward operation whose reverse is derived automatically.
    pub fn operation(mut self, op: impl Operation + 'static) -> Self {
        self.up.push(Box::new(op));
        self
    }

    /// Replace the derived reverse with explicit operations, run in the
    /// given order. They may deliberately undo only part of `up`.
    pub fn down(mut self, ops: Vec<Box<dyn Operation>>) -> Self {
        self.down = Some(ops);
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some() || self.up.iter().all(|op| op.is_reversible())
    }

    pub fn up_sql(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        let mut statements = Vec::new();
        for op in &self.up {
            statements.extend(op.forward(backend)?);
        }
        Ok(statements)
    }

    /// `None` when the record is not reversible.
    pub fn down_sql(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        let mut statements = Vec::new();

        if let Some(ref down) = self.down {
            for op in down {
                statements.extend(op.forward(backend)?);
            }
            return Ok(Some(statements));
        }

        for op in self.up.iter().rev() {
            match op.backward(backend)? {
                Some(reverse) => statements.extend(reverse),
                None => return Ok(None),
            }
        }
        Ok(Some(statements))
    }

    pub fn up_operations(&self) -> &[Box<dyn Operation>] {
        &self.up
    }

    pub fn down_operations(&self) -> Option<&[Box<dyn Operation>]> {
        self.down.as_deref()
    }
}

/// Known migration records, always iterated in ascending identifier order.
#[derive(Debug, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<&'static str, Migration>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, migration: Migration) -> Result<(), MigrationError> {
        let identifier = migration.identifier;
        if self.migrations.contains_key(identifier) {
            return Err(MigrationError::DuplicateIdentifier(identifier.to_string()));
        }
        self.migrations.insert(identifier, migration);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&Migration> {
        self.migrations.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.migrations.contains_key(identifier)
    }

    pub fn all(&self) -> impl DoubleEndedIterator<Item = &Migration> {
        self.migrations.values()
    }

    pub fn identifiers(&self) -> impl DoubleEndedIterator<Item = &'static str> + '_ {
        self.migrations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// A single record's forward or reverse step failed. The ledger holds
/// exactly the state from before that record's attempt.
#[derive(Debug, Error)]
#[error("migration {identifier} failed: {cause}{}", completed_suffix(.completed))]
pub struct MigrationApplyError {
    pub identifier: String,
    #[source]
    pub cause: StoreError,
    /// Records successfully processed earlier in the same run.
    pub completed: Vec<String>,
}

fn completed_suffix(completed: &[String]) -> String {
    if completed.is_empty() {
        String::new()
    } else {
        format!(" (completed: {})", completed.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration not found: {0}")]
    NotFound(String),
    #[error("duplicate migration identifier: {0}")]
    DuplicateIdentifier(String),
    #[error("migration is not reversible: {0}")]
    NotReversible(String),
    #[error("migration {pending} is pending but sorts before applied migration {latest_applied}")]
    OutOfOrder {
        pending: String,
        latest_applied: String,
    },
    #[error("migration {identifier}: {source}")]
    Unsupported {
        identifier: String,
        #[source]
        source: UnsupportedOperation,
    },
    #[error("reading migration ledger: {0}")]
    Ledger(#[source] StoreError),
    #[error(transparent)]
    Apply(#[from] MigrationApplyError),
}

impl MigrationError {
    /// Identifier of the record a failed run stopped at, if any.
    pub fn failed_identifier(&self) -> Option<&str> {
        match self {
            MigrationError::Apply(err) => Some(&err.identifier),
            MigrationError::Unsupported { identifier, .. } => Some(identifier),
            _ => None,
        }
    }
}
