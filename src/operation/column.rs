use crate::backend::{Backend, ColumnChanges};
use crate::column::{Column, ColumnType};
use crate::operation::{Operation, UnsupportedOperation};

#[derive(Debug, Clone)]
pub struct AddColumn {
    pub table: String,
    pub column: Column,
}

impl AddColumn {
    pub fn new(table: impl Into<String>, column: Column) -> Self {
        Self {
            table: table.into(),
            column,
        }
    }
}

impl Operation for AddColumn {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.add_column_sql(&self.table, &self.column)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(vec![
            backend.drop_column_sql(&self.table, &self.column.name)
        ]))
    }

    fn describe(&self) -> String {
        format!("Add column {} to {}", self.column.name, self.table)
    }
}

/// Drops a column. Reversible only with the previous definition attached.
#[derive(Debug, Clone)]
pub struct DropColumn {
    pub table: String,
    pub name: String,
    pub definition: Option<Column>,
}

impl DropColumn {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            definition: None,
        }
    }

    pub fn with_definition(mut self, column: Column) -> Self {
        self.definition = Some(column);
        self
    }
}

impl Operation for DropColumn {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.drop_column_sql(&self.table, &self.name)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(self
            .definition
            .as_ref()
            .map(|column| vec![backend.add_column_sql(&self.table, column)]))
    }

    fn describe(&self) -> String {
        format!("Drop column {} from {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.definition.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RenameColumn {
    pub table: String,
    pub from: String,
    pub to: String,
}

impl RenameColumn {
    pub fn new(table: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

impl Operation for RenameColumn {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.rename_column_sql(&self.table, &self.from, &self.to)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(vec![
            backend.rename_column_sql(&self.table, &self.to, &self.from)
        ]))
    }

    fn describe(&self) -> String {
        format!("Rename column {} to {} on {}", self.from, self.to, self.table)
    }
}

/// Changes type, nullability or default of an existing column.
#[derive(Debug, Clone)]
pub struct AlterColumn {
    pub table: String,
    pub name: String,
    pub changes: ColumnChanges,
    pub reverse: Option<ColumnChanges>,
}

impl AlterColumn {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            changes: ColumnChanges::new(),
            reverse: None,
        }
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.changes.column_type = Some(column_type);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.changes.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, default: Option<String>) -> Self {
        self.changes.default = Some(default);
        self
    }

    pub fn with_reverse(mut self, reverse: ColumnChanges) -> Self {
        self.reverse = Some(reverse);
        self
    }

    /// Shorthand for `set_nullable(true)` reversed by `set_nullable(false)`.
    pub fn drop_not_null(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(table, name)
            .set_nullable(true)
            .with_reverse(ColumnChanges::new().set_nullable(false))
    }
}

impl Operation for AlterColumn {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.alter_column_sql(
            &self.table,
            &self.name,
            &self.changes,
        )?])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        match self.reverse {
            Some(ref reverse) => Ok(Some(vec![backend.alter_column_sql(
                &self.table,
                &self.name,
                reverse,
            )?])),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("Alter column {} on {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.reverse.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Postgres, Sqlite};

    #[test]
    fn add_column_reverses_to_drop() {
        let op = AddColumn::new("softwares", Column::new("keywords", ColumnType::JsonB));

        let forward = op.forward(&Sqlite).unwrap();
        assert!(forward[0].contains("ADD COLUMN \"keywords\""));

        let backward = op.backward(&Sqlite).unwrap().unwrap();
        assert_eq!(
            backward[0],
            "ALTER TABLE \"softwares\" DROP COLUMN \"keywords\""
        );
    }

    #[test]
    fn drop_column_needs_definition_to_reverse() {
        let bare = DropColumn::new("agents", "about");
        assert!(!bare.is_reversible());
        assert_eq!(bare.backward(&Sqlite).unwrap(), None);

        let with_definition = DropColumn::new("agents", "about")
            .with_definition(Column::new("about", ColumnType::Text));
        assert!(with_definition.is_reversible());
        let backward = with_definition.backward(&Sqlite).unwrap().unwrap();
        assert!(backward[0].contains("ADD COLUMN \"about\""));
    }

    #[test]
    fn rename_column_swaps_names_on_reverse() {
        let op = RenameColumn::new("users", "isPublic", "isPublicProfile");

        assert_eq!(
            op.forward(&Sqlite).unwrap()[0],
            "ALTER TABLE \"users\" RENAME COLUMN \"isPublic\" TO \"isPublicProfile\""
        );
        assert_eq!(
            op.backward(&Sqlite).unwrap().unwrap()[0],
            "ALTER TABLE \"users\" RENAME COLUMN \"isPublicProfile\" TO \"isPublic\""
        );
    }

    #[test]
    fn drop_not_null_is_reversible_on_postgres() {
        let op = AlterColumn::drop_not_null("software_users", "version");

        assert!(op.is_reversible());
        assert!(op.forward(&Postgres).unwrap()[0].contains("DROP NOT NULL"));
        assert!(op.backward(&Postgres).unwrap().unwrap()[0].contains("SET NOT NULL"));
    }

    #[test]
    fn alter_column_without_reverse_is_irreversible() {
        let op = AlterColumn::new("softwares", "license").set_type(ColumnType::VarChar(255));
        assert!(!op.is_reversible());
        assert_eq!(op.backward(&Postgres).unwrap(), None);
    }

    #[test]
    fn alter_column_fails_on_sqlite() {
        let op = AlterColumn::drop_not_null("software_users", "version");
        let err = op.forward(&Sqlite).unwrap_err();
        assert_eq!(
            err.to_string(),
            "alter column version on software_users is not supported by the sqlite backend"
        );
    }
}
