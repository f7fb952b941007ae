use chrono::{DateTime, Utc};
use mysql::prelude::Queryable;
use mysql::PooledConn;

use crate::store::{
    validate_table_name, Ledger, LedgerEntry, SchemaStore, StoreError, DEFAULT_LEDGER_TABLE,
};

/// MySQL commits DDL implicitly, so `begin`/`commit` only bracket the
/// ledger write; the runner never wraps records in transactions here.
pub struct MySqlStore<'a> {
    conn: &'a mut PooledConn,
    table: String,
}

impl<'a> MySqlStore<'a> {
    pub fn new(conn: &'a mut PooledConn) -> Result<Self, StoreError> {
        Self::with_table(conn, DEFAULT_LEDGER_TABLE)
    }

    pub fn with_table(conn: &'a mut PooledConn, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        conn.query_drop(format!(
            "CREATE TABLE IF NOT EXISTS {} (
                identifier VARCHAR(255) PRIMARY KEY,
                applied_at VARCHAR(64) NOT NULL
            )",
            table
        ))?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

impl SchemaStore for MySqlStore<'_> {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("START TRANSACTION")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        self.conn.query_drop(sql)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.query_drop("ROLLBACK")?;
        Ok(())
    }
}

impl Ledger for MySqlStore<'_> {
    fn entries(&mut self) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows: Vec<(String, String)> = self.conn.query(format!(
            "SELECT identifier, applied_at FROM {} ORDER BY identifier",
            self.table
        ))?;

        rows.into_iter()
            .map(|(identifier, applied_at)| LedgerEntry::parse(identifier, &applied_at))
            .collect()
    }

    fn record(&mut self, identifier: &str, applied_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.conn.exec_drop(
            format!(
                "INSERT INTO {} (identifier, applied_at) VALUES (?, ?)",
                self.table
            ),
            (identifier, applied_at.to_rfc3339()),
        )?;
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> Result<(), StoreError> {
        self.conn.exec_drop(
            format!("DELETE FROM {} WHERE identifier = ?", self.table),
            (identifier,),
        )?;
        Ok(())
    }
}
