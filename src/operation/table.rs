use crate::backend::Backend;
use crate::column::{Column, ColumnType};
use crate::operation::{Operation, UnsupportedOperation};

#[derive(Debug, Clone)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<Column>,
}

impl CreateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column::new(name, column_type));
        self
    }

    pub fn add_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

impl Operation for CreateTable {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.create_table_sql(&self.name, &self.columns)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(vec![backend.drop_table_sql(&self.name)]))
    }

    fn describe(&self) -> String {
        format!("Create table {}", self.name)
    }
}

/// Drops a table. Reversible only when the dropped columns are supplied.
#[derive(Debug, Clone)]
pub struct DropTable {
    pub name: String,
    pub columns: Option<Vec<Column>>,
}

impl DropTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }
}

impl Operation for DropTable {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.drop_table_sql(&self.name)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(self
            .columns
            .as_ref()
            .map(|columns| vec![backend.create_table_sql(&self.name, columns)]))
    }

    fn describe(&self) -> String {
        format!("Drop table {}", self.name)
    }

    fn is_reversible(&self) -> bool {
        self.columns.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RenameTable {
    pub from: String,
    pub to: String,
}

impl RenameTable {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Operation for RenameTable {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.rename_table_sql(&self.from, &self.to)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(vec![backend.rename_table_sql(&self.to, &self.from)]))
    }

    fn describe(&self) -> String {
        format!("Rename table {} to {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sqlite;

    #[test]
    fn create_table_renders_columns() {
        let op = CreateTable::new("agents")
            .add_column(Column::new("id", ColumnType::Serial).primary_key())
            .add_column(Column::new("email", ColumnType::Text).not_null().unique());

        let sql = op.forward(&Sqlite).unwrap();
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains("CREATE TABLE \"agents\""));
        assert!(sql[0].contains("AUTOINCREMENT"));
        assert!(sql[0].contains("\"email\""));
        assert!(sql[0].contains("NOT NULL"));
    }

    #[test]
    fn create_table_reverses_to_drop() {
        let op = CreateTable::new("agents");
        assert_eq!(
            op.backward(&Sqlite).unwrap(),
            Some(vec!["DROP TABLE \"agents\"".to_string()])
        );
    }

    #[test]
    fn drop_table_without_columns_is_irreversible() {
        let op = DropTable::new("compiled_softwares");
        assert!(!op.is_reversible());
        assert_eq!(op.backward(&Sqlite).unwrap(), None);
    }

    #[test]
    fn drop_table_with_columns_recreates() {
        let op = DropTable::new("compiled_softwares")
            .with_columns(vec![Column::new("softwareId", ColumnType::Integer)]);

        assert!(op.is_reversible());
        let reverse = op.backward(&Sqlite).unwrap().unwrap();
        assert!(reverse[0].contains("CREATE TABLE \"compiled_softwares\""));
    }

    #[test]
    fn rename_table_both_directions() {
        let op = RenameTable::new("agents", "users");

        assert_eq!(
            op.forward(&Sqlite).unwrap(),
            vec!["ALTER TABLE \"agents\" RENAME TO \"users\"".to_string()]
        );
        assert_eq!(
            op.backward(&Sqlite).unwrap(),
            Some(vec!["ALTER TABLE \"users\" RENAME TO \"agents\"".to_string()])
        );
        assert_eq!(op.describe(), "Rename table agents to users");
    }
}
