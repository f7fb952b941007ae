use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::store::{
    validate_table_name, Ledger, LedgerEntry, SchemaStore, StoreError, DEFAULT_LEDGER_TABLE,
};

pub struct SqliteStore<'a> {
    conn: &'a Connection,
    table: String,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Result<Self, StoreError> {
        Self::with_table(conn, DEFAULT_LEDGER_TABLE)
    }

    pub fn with_table(conn: &'a Connection, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    identifier TEXT PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
                table
            ),
            [],
        )?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

impl SchemaStore for SqliteStore<'_> {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Ledger for SqliteStore<'_> {
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT identifier, applied_at FROM {} ORDER BY identifier",
            self.table
        ))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(identifier, applied_at)| LedgerEntry::parse(identifier, &applied_at))
            .collect()
    }

    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (identifier, applied_at) VALUES (?1, ?2)",
                self.table
            ),
            params![identifier, applied_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE identifier = ?1", self.table),
            [identifier],
        )?;
        Ok(())
    }
}
