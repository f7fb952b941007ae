use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::store::{Ledger, LedgerEntry, SchemaStore, StoreError};

type FailurePredicate = Box<dyn Fn(&str) -> bool + Send>;

/// Store that records executed statements instead of running them. Used for
/// dry runs and tests; transactions snapshot and restore both the statement
/// log and the ledger.
#[derive(Default)]
pub struct InMemoryStore {
    executed: Vec<String>,
    ledger: BTreeMap<String, DateTime<Utc>>,
    snapshot: Option<(usize, BTreeMap<String, DateTime<Utc>>)>,
    fail_when: Option<FailurePredicate>,
    counts: TransactionCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionCounts {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the given identifiers already applied.
    pub fn with_applied<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Utc::now();
        Self {
            ledger: identifiers
                .into_iter()
                .map(|identifier| (identifier.into(), now))
                .collect(),
            ..Self::default()
        }
    }

    /// Make `execute` fail for every statement matching `predicate`.
    pub fn fail_when(mut self, predicate: impl Fn(&str) -> bool + Send + 'static) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn applied_identifiers(&self) -> Vec<&str> {
        self.ledger.keys().map(String::as_str).collect()
    }

    pub fn transaction_counts(&self) -> TransactionCounts {
        self.counts
    }
}

impl SchemaStore for InMemoryStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::Message(
                "transaction already in progress".to_string(),
            ));
        }
        self.snapshot = Some((self.executed.len(), self.ledger.clone()));
        self.counts.begun += 1;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        if let Some(ref fail_when) = self.fail_when {
            if fail_when(sql) {
                return Err(StoreError::Message(format!("simulated failure: {}", sql)));
            }
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot
            .take()
            .ok_or_else(|| StoreError::Message("no transaction in progress".to_string()))?;
        self.counts.committed += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let (executed, ledger) = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::Message("no transaction in progress".to_string()))?;
        self.executed.truncate(executed);
        self.ledger = ledger;
        self.counts.rolled_back += 1;
        Ok(())
    }
}

impl Ledger for InMemoryStore {
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .ledger
            .iter()
            .map(|(identifier, applied_at)| LedgerEntry::new(identifier.clone(), *applied_at))
            .collect())
    }

    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.ledger.insert(identifier.to_string(), applied_at);
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<(), StoreError> {
        self.ledger.remove(identifier);
        Ok(())
    }
}
