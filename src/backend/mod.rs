mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use sea_query::{
    Alias, ColumnDef, ForeignKey as SeaForeignKey, ForeignKeyAction, Index as SeaIndex,
    IndexCreateStatement, IndexDropStatement, Table, TableAlterStatement, TableCreateStatement,
    TableDropStatement, TableRenameStatement,
};

use crate::column::{Column, ColumnType, ReferentialAction};
use crate::operation::{Index, IndexOrder, UnsupportedOperation};

/// SQL dialect renderer. Statement construction is shared; each dialect only
/// supplies the `sea-query` builder and its capability flags.
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports_alter_column(&self) -> bool;
    fn supports_transactional_ddl(&self) -> bool;
    /// Whether enumerated types exist as standalone schema objects.
    fn supports_enum_types(&self) -> bool {
        false
    }
    /// Whether `CREATE INDEX ... WHERE` is accepted.
    fn supports_partial_indexes(&self) -> bool {
        true
    }
    /// Whether altering a column restates its full definition, so a change
    /// without a type cannot be rendered.
    fn alter_column_requires_type(&self) -> bool {
        false
    }

    fn build_table_create(&self, stmt: TableCreateStatement) -> String;
    fn build_table_drop(&self, stmt: TableDropStatement) -> String;
    fn build_table_rename(&self, stmt: TableRenameStatement) -> String;
    fn build_table_alter(&self, stmt: TableAlterStatement) -> String;
    fn build_index_create(&self, stmt: IndexCreateStatement) -> String;
    fn build_index_drop(&self, stmt: IndexDropStatement) -> String;

    fn quote_identifier(&self, name: &str) -> String;

    fn create_table_sql(&self, name: &str, columns: &[Column]) -> String {
        let mut stmt = Table::create();
        stmt.table(Alias::new(name));

        for column in columns {
            stmt.col(column_def(column));
        }

        for column in columns {
            if let Some(ref reference) = column.references {
                stmt.foreign_key(
                    SeaForeignKey::create()
                        .from_col(Alias::new(&column.name))
                        .to_tbl(Alias::new(&reference.table))
                        .to_col(Alias::new(&reference.column))
                        .on_delete(foreign_key_action(reference.on_delete)),
                );
            }
        }

        self.build_table_create(stmt)
    }

    fn drop_table_sql(&self, name: &str) -> String {
        let stmt = Table::drop().table(Alias::new(name)).to_owned();
        self.build_table_drop(stmt)
    }

    fn rename_table_sql(&self, from: &str, to: &str) -> String {
        let stmt = Table::rename()
            .table(Alias::new(from), Alias::new(to))
            .to_owned();
        self.build_table_rename(stmt)
    }

    fn add_column_sql(&self, table: &str, column: &Column) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .add_column(column_def(column))
            .to_owned();
        self.build_table_alter(stmt)
    }

    fn drop_column_sql(&self, table: &str, column: &str) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .drop_column(Alias::new(column))
            .to_owned();
        self.build_table_alter(stmt)
    }

    fn rename_column_sql(&self, table: &str, from: &str, to: &str) -> String {
        let stmt = Table::alter()
            .table(Alias::new(table))
            .rename_column(Alias::new(from), Alias::new(to))
            .to_owned();
        self.build_table_alter(stmt)
    }

    fn alter_column_sql(
        &self,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> Result<String, UnsupportedOperation> {
        if !self.supports_alter_column() {
            return Err(UnsupportedOperation::new(
                self.name(),
                format!("alter column {} on {}", column, table),
            ));
        }
        if self.alter_column_requires_type() && changes.column_type.is_none() {
            return Err(UnsupportedOperation::new(
                self.name(),
                format!("alter column {} on {} without a column type", column, table),
            ));
        }

        let mut col = ColumnDef::new(Alias::new(column));

        if let Some(ref column_type) = changes.column_type {
            apply_column_type(&mut col, column_type);
        }

        match changes.nullable {
            Some(true) => {
                col.null();
            }
            Some(false) => {
                col.not_null();
            }
            None => {}
        }

        if let Some(Some(ref default)) = changes.default {
            col.default(sea_query::Expr::cust(default));
        }

        let stmt = Table::alter()
            .table(Alias::new(table))
            .modify_column(col)
            .to_owned();

        Ok(self.build_table_alter(stmt))
    }

    fn create_index_sql(&self, table: &str, index: &Index) -> Result<String, UnsupportedOperation> {
        if index.predicate.is_some() && !self.supports_partial_indexes() {
            return Err(UnsupportedOperation::new(
                self.name(),
                format!("partial index {} on {}", index.name, table),
            ));
        }

        let mut stmt = SeaIndex::create();
        stmt.name(&index.name).table(Alias::new(table));

        if index.unique {
            stmt.unique();
        }

        for (column, order) in &index.columns {
            match order {
                IndexOrder::Asc => stmt.col(Alias::new(column)),
                IndexOrder::Desc => stmt.col((Alias::new(column), sea_query::IndexOrder::Desc)),
            };
        }

        let sql = self.build_index_create(stmt.to_owned());
        Ok(match index.predicate {
            Some(ref predicate) => format!("{} WHERE {}", sql, predicate),
            None => sql,
        })
    }

    fn drop_index_sql(&self, table: &str, index_name: &str) -> String {
        let stmt = SeaIndex::drop()
            .name(index_name)
            .table(Alias::new(table))
            .to_owned();
        self.build_index_drop(stmt)
    }

    /// `None` when the dialect has no standalone enumerated types; columns
    /// then carry their variants inline or as plain text.
    fn create_enum_sql(&self, _name: &str, _variants: &[String]) -> Option<String> {
        None
    }

    fn drop_enum_sql(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Partial column redefinition used by `AlterColumn`.
#[derive(Debug, Clone, Default)]
pub struct ColumnChanges {
    pub column_type: Option<ColumnType>,
    pub nullable: Option<bool>,
    pub default: Option<Option<String>>,
}

impl ColumnChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    pub fn set_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn set_default(mut self, default: Option<String>) -> Self {
        self.default = Some(default);
        self
    }
}

fn column_def(column: &Column) -> ColumnDef {
    let mut col = ColumnDef::new(Alias::new(&column.name));

    apply_column_type(&mut col, &column.column_type);

    if column.primary_key {
        col.primary_key();
        if column.column_type.is_serial() {
            col.auto_increment();
        }
    } else {
        if !column.nullable {
            col.not_null();
        }
        if column.unique {
            col.unique_key();
        }
    }

    if let Some(ref default) = column.default {
        col.default(sea_query::Expr::cust(default));
    }

    col
}

fn apply_column_type(col: &mut ColumnDef, column_type: &ColumnType) {
    match column_type {
        ColumnType::Serial | ColumnType::Integer => {
            col.integer();
        }
        ColumnType::BigSerial | ColumnType::BigInt => {
            col.big_integer();
        }
        ColumnType::SmallInt => {
            col.small_integer();
        }
        ColumnType::Text => {
            col.text();
        }
        ColumnType::VarChar(len) => {
            col.string_len(*len as u32);
        }
        ColumnType::Boolean => {
            col.boolean();
        }
        ColumnType::Timestamp => {
            col.timestamp();
        }
        ColumnType::TimestampTz => {
            col.timestamp_with_time_zone();
        }
        ColumnType::Date => {
            col.date();
        }
        ColumnType::Uuid => {
            col.uuid();
        }
        ColumnType::Json => {
            col.json();
        }
        ColumnType::JsonB => {
            col.json_binary();
        }
        ColumnType::Real => {
            col.float();
        }
        ColumnType::DoublePrecision => {
            col.double();
        }
        ColumnType::Enum { name, variants } => {
            col.enumeration(Alias::new(name), variants.iter().map(Alias::new));
        }
    }
}

fn foreign_key_action(action: ReferentialAction) -> ForeignKeyAction {
    match action {
        ReferentialAction::NoAction => ForeignKeyAction::NoAction,
        ReferentialAction::Restrict => ForeignKeyAction::Restrict,
        ReferentialAction::Cascade => ForeignKeyAction::Cascade,
        ReferentialAction::SetNull => ForeignKeyAction::SetNull,
    }
}
