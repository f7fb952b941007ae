use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::migration::{Migration, MigrationApplyError, MigrationError, MigrationRegistry};
use crate::store::{Ledger, LedgerEntry, SchemaStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "up",
            Direction::Reverse => "down",
        }
    }
}

/// Rendered step of a run: one record and its statements.
struct Step {
    identifier: &'static str,
    atomic: bool,
    statements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub identifier: &'static str,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Brings a store from its current ledger state to the state described by
/// the registry, one record per transaction.
pub struct Migrator<'a, S> {
    registry: &'a MigrationRegistry,
    backend: &'a dyn Backend,
    store: S,
    allow_unordered: bool,
}

impl<'a, S: SchemaStore + Ledger> Migrator<'a, S> {
    pub fn new(registry: &'a MigrationRegistry, backend: &'a dyn Backend, store: S) -> Self {
        Self {
            registry,
            backend,
            store,
            allow_unordered: false,
        }
    }

    /// Permit applying a pending record that sorts before the latest
    /// applied one, e.g. after merging branches authored in parallel.
    pub fn allow_unordered(mut self, allow: bool) -> Self {
        self.allow_unordered = allow;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn ledger_entries(&mut self) -> Result<Vec<LedgerEntry>, MigrationError> {
        let mut entries = self.store.entries().map_err(MigrationError::Ledger)?;
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(entries)
    }

    /// Every known record with its application time, in identifier order.
    pub fn status(&mut self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let entries = self.ledger_entries()?;
        Ok(self
            .registry
            .identifiers()
            .map(|identifier| MigrationStatus {
                identifier,
                applied_at: entries
                    .iter()
                    .find(|entry| entry.identifier == identifier)
                    .map(|entry| entry.applied_at),
            })
            .collect())
    }

    /// Pending records in ascending order.
    pub fn plan_forward(&mut self) -> Result<Vec<&'static str>, MigrationError> {
        let entries = self.ledger_entries()?;
        let pending: Vec<&'static str> = self
            .registry
            .identifiers()
            .filter(|identifier| !entries.iter().any(|entry| entry.identifier == *identifier))
            .collect();

        if !self.allow_unordered {
            if let (Some(latest), Some(first_pending)) = (entries.last(), pending.first()) {
                if *first_pending < latest.identifier.as_str() {
                    return Err(MigrationError::OutOfOrder {
                        pending: first_pending.to_string(),
                        latest_applied: latest.identifier.clone(),
                    });
                }
            }
        }

        Ok(pending)
    }

    /// Applied records sorting after `target` (all applied records when
    /// `None`), in descending order.
    pub fn plan_reverse(
        &mut self,
        target: Option<&str>,
    ) -> Result<Vec<&'static str>, MigrationError> {
        if let Some(target) = target {
            if !self.registry.contains(target) {
                return Err(MigrationError::NotFound(target.to_string()));
            }
        }

        let entries = self.ledger_entries()?;
        let mut plan = Vec::new();

        for entry in entries.iter().rev() {
            if matches!(target, Some(target) if entry.identifier.as_str() <= target) {
                break;
            }
            let migration = self
                .registry
                .get(&entry.identifier)
                .ok_or_else(|| MigrationError::NotFound(entry.identifier.clone()))?;
            if !migration.is_reversible() {
                return Err(MigrationError::NotReversible(entry.identifier.clone()));
            }
            plan.push(migration.identifier);
        }

        Ok(plan)
    }

    fn render(
        &self,
        identifiers: &[&'static str],
        direction: Direction,
    ) -> Result<Vec<Step>, MigrationError> {
        identifiers
            .iter()
            .map(|identifier| {
                let migration = self.migration(identifier)?;
                let statements = match direction {
                    Direction::Forward => migration.up_sql(self.backend).map(Some),
                    Direction::Reverse => migration.down_sql(self.backend),
                }
                .map_err(|source| MigrationError::Unsupported {
                    identifier: identifier.to_string(),
                    source,
                })?
                .ok_or_else(|| MigrationError::NotReversible(identifier.to_string()))?;
                Ok(Step {
                    identifier: migration.identifier,
                    atomic: migration.is_atomic(),
                    statements,
                })
            })
            .collect()
    }

    fn migration(&self, identifier: &str) -> Result<&'a Migration, MigrationError> {
        self.registry
            .get(identifier)
            .ok_or_else(|| MigrationError::NotFound(identifier.to_string()))
    }

    pub fn generate_forward_sql(
        &mut self,
    ) -> Result<Vec<(&'static str, Vec<String>)>, MigrationError> {
        let plan = self.plan_forward()?;
        Ok(self
            .render(&plan, Direction::Forward)?
            .into_iter()
            .map(|step| (step.identifier, step.statements))
            .collect())
    }

    pub fn generate_reverse_sql(
        &mut self,
        target: Option<&str>,
    ) -> Result<Vec<(&'static str, Vec<String>)>, MigrationError> {
        let plan = self.plan_reverse(target)?;
        Ok(self
            .render(&plan, Direction::Reverse)?
            .into_iter()
            .map(|step| (step.identifier, step.statements))
            .collect())
    }

    /// Applies every pending record in ascending order and returns the
    /// identifiers applied. Stops at the first failure.
    pub fn apply_forward(&mut self) -> Result<Vec<String>, MigrationError> {
        let plan = self.plan_forward()?;
        if plan.is_empty() {
            info!("no pending migrations");
            return Ok(Vec::new());
        }
        info!(count = plan.len(), "applying pending migrations");
        let steps = self.render(&plan, Direction::Forward)?;
        self.run(steps, Direction::Forward)
    }

    /// Reverses applied records sorting after `target`, newest first, and
    /// returns the identifiers reversed. Stops at the first failure.
    pub fn apply_reverse(&mut self, target: Option<&str>) -> Result<Vec<String>, MigrationError> {
        let plan = self.plan_reverse(target)?;
        if plan.is_empty() {
            info!(to = target.unwrap_or("<none>"), "no migrations to reverse");
            return Ok(Vec::new());
        }
        info!(count = plan.len(), "reversing migrations");
        let steps = self.render(&plan, Direction::Reverse)?;
        self.run(steps, Direction::Reverse)
    }

    fn run(&mut self, steps: Vec<Step>, direction: Direction) -> Result<Vec<String>, MigrationError> {
        let transactional = self.backend.supports_transactional_ddl();
        let mut completed = Vec::new();

        for step in steps {
            let wrap = transactional && step.atomic;

            if let Err(cause) = self.run_step(&step, direction, wrap) {
                return Err(MigrationApplyError {
                    identifier: step.identifier.to_string(),
                    cause,
                    completed,
                }
                .into());
            }

            info!(
                identifier = step.identifier,
                direction = direction.as_str(),
                "migration complete"
            );
            completed.push(step.identifier.to_string());
        }

        Ok(completed)
    }

    fn run_step(&mut self, step: &Step, direction: Direction, wrap: bool) -> Result<(), StoreError> {
        if wrap {
            self.store.begin()?;
        }

        let result = self.execute_step(step, direction);

        match result {
            Ok(()) if wrap => {
                if let Err(err) = self.store.commit() {
                    self.rollback(step.identifier);
                    return Err(err);
                }
                Ok(())
            }
            Ok(()) => Ok(()),
            Err(err) => {
                if wrap {
                    self.rollback(step.identifier);
                }
                Err(err)
            }
        }
    }

    fn execute_step(&mut self, step: &Step, direction: Direction) -> Result<(), StoreError> {
        for sql in &step.statements {
            debug!(identifier = step.identifier, %sql, "executing");
            self.store.execute(sql)?;
        }
        match direction {
            Direction::Forward => self.store.record(step.identifier, Utc::now()),
            Direction::Reverse => self.store.remove(step.identifier),
        }
    }

    fn rollback(&mut self, identifier: &str) {
        warn!(identifier, "rolling back migration");
        if let Err(err) = self.store.rollback() {
            warn!(identifier, error = %err, "rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MySql, Postgres, Sqlite};
    use crate::column::{Column, ColumnType};
    use crate::operation::{AddColumn, AlterColumn, CreateTable, DropTable};
    use crate::store::InMemoryStore;

    fn registry() -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Migration::new("1").operation(
                CreateTable::new("agents")
                    .add_column(Column::new("id", ColumnType::Serial).primary_key()),
            ))
            .unwrap();
        registry
            .register(
                Migration::new("2")
                    .operation(AddColumn::new("agents", Column::new("email", ColumnType::Text))),
            )
            .unwrap();
        registry
            .register(Migration::new("3").operation(CreateTable::new("softwares")))
            .unwrap();
        registry
    }

    #[test]
    fn forward_from_empty_ledger_applies_in_order() {
        let registry = registry();
        let mut migrator = Migrator::new(&registry, &Sqlite, InMemoryStore::new());

        let applied = migrator.apply_forward().unwrap();
        assert_eq!(applied, vec!["1", "2", "3"]);

        let store = migrator.into_store();
        assert_eq!(store.applied_identifiers(), vec!["1", "2", "3"]);
        assert!(store.executed()[0].contains("CREATE TABLE \"agents\""));
        assert!(store.executed()[1].contains("ADD COLUMN \"email\""));
        assert!(store.executed()[2].contains("CREATE TABLE \"softwares\""));
    }

    #[test]
    fn forward_is_idempotent() {
        let registry = registry();
        let mut migrator = Migrator::new(&registry, &Sqlite, InMemoryStore::new());

        migrator.apply_forward().unwrap();
        let executed_after_first = migrator.store().executed().len();

        let second = migrator.apply_forward().unwrap();
        assert!(second.is_empty());
        assert_eq!(migrator.store().executed().len(), executed_after_first);
        assert_eq!(migrator.store().applied_identifiers(), vec!["1", "2", "3"]);
    }

    #[test]
    fn forward_skips_applied_records() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        assert_eq!(migrator.plan_forward().unwrap(), vec!["2", "3"]);
    }

    #[test]
    fn mid_batch_failure_keeps_earlier_records() {
        let registry = registry();
        let store = InMemoryStore::new().fail_when(|sql| sql.contains("ADD COLUMN"));
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        let err = migrator.apply_forward().unwrap_err();
        match err {
            MigrationError::Apply(ref failure) => {
                assert_eq!(failure.identifier, "2");
                assert_eq!(failure.completed, vec!["1"]);
            }
            ref other => panic!("expected apply error, got {other:?}"),
        }
        assert_eq!(err.failed_identifier(), Some("2"));

        let store = migrator.into_store();
        assert_eq!(store.applied_identifiers(), vec!["1"]);
        assert_eq!(store.transaction_counts().rolled_back, 1);
        assert_eq!(store.transaction_counts().committed, 1);
    }

    #[test]
    fn reverse_to_target_runs_down_newest_first() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "2", "3"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        let reversed = migrator.apply_reverse(Some("1")).unwrap();
        assert_eq!(reversed, vec!["3", "2"]);

        let store = migrator.into_store();
        assert_eq!(store.applied_identifiers(), vec!["1"]);
        assert_eq!(store.executed()[0], "DROP TABLE \"softwares\"");
        assert_eq!(store.executed()[1], "ALTER TABLE \"agents\" DROP COLUMN \"email\"");
    }

    #[test]
    fn reverse_without_target_clears_ledger() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "2", "3"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        assert_eq!(migrator.plan_reverse(None).unwrap(), vec!["3", "2", "1"]);
        migrator.apply_reverse(None).unwrap();
        assert!(migrator.store().applied_identifiers().is_empty());
    }

    #[test]
    fn forward_then_reverse_restores_ledger() {
        let registry = registry();
        let mut migrator = Migrator::new(&registry, &Sqlite, InMemoryStore::new());

        migrator.apply_forward().unwrap();
        migrator.apply_reverse(None).unwrap();
        assert!(migrator.store().applied_identifiers().is_empty());
        assert!(migrator.apply_reverse(None).unwrap().is_empty());
    }

    #[test]
    fn reverse_failure_keeps_completed_reversals() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "2", "3"])
            .fail_when(|sql| sql.contains("DROP COLUMN"));
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        let err = migrator.apply_reverse(None).unwrap_err();
        assert_eq!(err.failed_identifier(), Some("2"));
        assert_eq!(migrator.store().applied_identifiers(), vec!["1", "2"]);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "2"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        assert!(matches!(
            migrator.apply_reverse(Some("9")),
            Err(MigrationError::NotFound(ref id)) if id == "9"
        ));
        assert_eq!(migrator.store().applied_identifiers(), vec!["1", "2"]);
    }

    #[test]
    fn ledger_entry_without_record_blocks_reverse() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "4_removed"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        assert!(matches!(
            migrator.plan_reverse(None),
            Err(MigrationError::NotFound(ref id)) if id == "4_removed"
        ));
    }

    #[test]
    fn irreversible_record_blocks_reverse_before_executing() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Migration::new("1").operation(CreateTable::new("a")))
            .unwrap();
        registry
            .register(Migration::new("2").operation(DropTable::new("legacy")))
            .unwrap();

        let store = InMemoryStore::with_applied(["1", "2"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        assert!(matches!(
            migrator.apply_reverse(None),
            Err(MigrationError::NotReversible(ref id)) if id == "2"
        ));
        assert!(migrator.store().executed().is_empty());
    }

    #[test]
    fn out_of_order_pending_record_is_rejected() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "3"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store);

        match migrator.apply_forward() {
            Err(MigrationError::OutOfOrder {
                pending,
                latest_applied,
            }) => {
                assert_eq!(pending, "2");
                assert_eq!(latest_applied, "3");
            }
            other => panic!("expected out-of-order error, got {other:?}"),
        }
        assert!(migrator.store().executed().is_empty());
    }

    #[test]
    fn out_of_order_allowed_when_configured() {
        let registry = registry();
        let store = InMemoryStore::with_applied(["1", "3"]);
        let mut migrator = Migrator::new(&registry, &Sqlite, store).allow_unordered(true);

        assert_eq!(migrator.apply_forward().unwrap(), vec!["2"]);
    }

    #[test]
    fn unsupported_operation_fails_before_any_execution() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Migration::new("1").operation(CreateTable::new("software_users")))
            .unwrap();
        registry
            .register(
                Migration::new("2")
                    .operation(AlterColumn::drop_not_null("software_users", "version")),
            )
            .unwrap();

        let mut migrator = Migrator::new(&registry, &Sqlite, InMemoryStore::new());
        assert!(matches!(
            migrator.apply_forward(),
            Err(MigrationError::Unsupported { ref identifier, .. }) if identifier == "2"
        ));
        assert!(migrator.store().executed().is_empty());

        let mut migrator = Migrator::new(&registry, &Postgres, InMemoryStore::new());
        assert_eq!(migrator.apply_forward().unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn each_atomic_record_gets_its_own_transaction() {
        let registry = registry();
        let mut migrator = Migrator::new(&registry, &Postgres, InMemoryStore::new());

        migrator.apply_forward().unwrap();
        let counts = migrator.store().transaction_counts();
        assert_eq!(counts.begun, 3);
        assert_eq!(counts.committed, 3);
        assert_eq!(counts.rolled_back, 0);
    }

    #[test]
    fn non_atomic_record_and_non_transactional_dialect_skip_transactions() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Migration::new("1").atomic(false).operation(CreateTable::new("a")))
            .unwrap();
        registry
            .register(Migration::new("2").operation(CreateTable::new("b")))
            .unwrap();

        let mut migrator = Migrator::new(&registry, &Postgres, InMemoryStore::new());
        migrator.apply_forward().unwrap();
        assert_eq!(migrator.store().transaction_counts().begun, 1);

        let mut migrator = Migrator::new(&registry, &MySql, InMemoryStore::new());
        migrator.apply_forward().unwrap();
        assert_eq!(migrator.store().transaction_counts().begun, 0);
    }

    #[test]
    fn generated_sql_matches_plan() {
        let registry = registry();
        let mut migrator =
            Migrator::new(&registry, &Sqlite, InMemoryStore::with_applied(["1"]));

        let forward = migrator.generate_forward_sql().unwrap();
        assert_eq!(forward.len(), 2);
        assert_eq!(forward[0].0, "2");
        assert!(forward[0].1[0].contains("ADD COLUMN"));

        let reverse = migrator.generate_reverse_sql(None).unwrap();
        assert_eq!(reverse.len(), 1);
        assert_eq!(reverse[0].0, "1");
        assert!(reverse[0].1[0].contains("DROP TABLE \"agents\""));

        assert!(migrator.store().executed().is_empty());
    }

    #[test]
    fn status_reports_applied_timestamps() {
        let registry = registry();
        let mut migrator =
            Migrator::new(&registry, &Sqlite, InMemoryStore::with_applied(["1"]));

        let status = migrator.status().unwrap();
        assert_eq!(status.len(), 3);
        assert_eq!(status[0].identifier, "1");
        assert!(status[0].applied_at.is_some());
        assert!(status[1].applied_at.is_none());
        assert!(status[2].applied_at.is_none());
    }

    #[test]
    fn empty_record_is_applied_without_statements() {
        let mut registry = MigrationRegistry::new();
        registry.register(Migration::new("0001_placeholder")).unwrap();

        let mut migrator = Migrator::new(&registry, &Sqlite, InMemoryStore::new());
        assert_eq!(migrator.apply_forward().unwrap(), vec!["0001_placeholder"]);
        assert!(migrator.store().executed().is_empty());
    }
}
