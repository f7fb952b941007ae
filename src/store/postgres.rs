use chrono::{DateTime, Utc};
use postgres::Client;

use crate::store::{
    validate_table_name, Ledger, LedgerEntry, SchemaStore, StoreError, DEFAULT_LEDGER_TABLE,
};

pub struct PostgresStore<'a> {
    client: &'a mut Client,
    table: String,
}

impl<'a> PostgresStore<'a> {
    pub fn new(client: &'a mut Client) -> Result<Self, StoreError> {
        Self::with_table(client, DEFAULT_LEDGER_TABLE)
    }

    pub fn with_table(client: &'a mut Client, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        client.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                identifier TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            table
        ))?;
        Ok(Self {
            client,
            table: table.to_string(),
        })
    }
}

impl SchemaStore for PostgresStore<'_> {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }
}

impl Ledger for PostgresStore<'_> {
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = self.client.query(
            &format!(
                "SELECT identifier, applied_at FROM {} ORDER BY identifier",
                self.table
            ),
            &[],
        )?;

        rows.iter()
            .map(|row| {
                let applied_at: String = row.get(1);
                LedgerEntry::parse(row.get(0), &applied_at)
            })
            .collect()
    }

    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.client.execute(
            &format!(
                "INSERT INTO {} (identifier, applied_at) VALUES ($1, $2)",
                self.table
            ),
            &[&identifier, &applied_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<(), StoreError> {
        self.client.execute(
            &format!("DELETE FROM {} WHERE identifier = $1", self.table),
            &[&identifier],
        )?;
        Ok(())
    }
}
