use sea_query::extension::postgres::Type;
use sea_query::{
    Alias, IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, TableAlterStatement,
    TableCreateStatement, TableDropStatement, TableRenameStatement,
};

use crate::backend::Backend;

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Backend for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn supports_alter_column(&self) -> bool {
        true
    }

    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn supports_enum_types(&self) -> bool {
        true
    }

    fn build_table_create(&self, stmt: TableCreateStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_table_drop(&self, stmt: TableDropStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_table_rename(&self, stmt: TableRenameStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_table_alter(&self, stmt: TableAlterStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_index_create(&self, stmt: IndexCreateStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn build_index_drop(&self, stmt: IndexDropStatement) -> String {
        stmt.to_string(PostgresQueryBuilder)
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn create_enum_sql(&self, name: &str, variants: &[String]) -> Option<String> {
        let stmt = Type::create()
            .as_enum(Alias::new(name))
            .values(variants.iter().map(Alias::new))
            .to_owned();
        Some(stmt.to_string(PostgresQueryBuilder))
    }

    fn drop_enum_sql(&self, name: &str) -> Option<String> {
        let stmt = Type::drop().name(Alias::new(name)).to_owned();
        Some(stmt.to_string(PostgresQueryBuilder))
    }
}
