pub mod backend;
pub mod catalog;
pub mod client;
pub mod column;
pub mod config;
pub mod i18n;
pub mod migration;
pub mod migrator;
pub mod operation;
pub mod rpc;
pub mod store;
pub mod upstream;

pub mod prelude {
    pub use crate::backend::{Backend, ColumnChanges, MySql, Postgres, Sqlite};
    pub use crate::column::{Column, ColumnType, Reference, ReferentialAction};
    pub use crate::migration::{
        Migration, MigrationApplyError, MigrationError, MigrationRegistry,
    };
    pub use crate::migrator::{MigrationStatus, Migrator};
    pub use crate::operation::{
        AddColumn, AlterColumn, CreateEnum, CreateIndex, CreateTable, DropColumn, DropEnum,
        DropIndex, DropTable, Index, IndexOrder, Operation, RenameColumn, RenameTable, RunSql,
        UnsupportedOperation,
    };
    pub use crate::store::{InMemoryStore, Ledger, LedgerEntry, SchemaStore, StoreError};

    #[cfg(feature = "sqlite")]
    pub use crate::store::SqliteStore;

    #[cfg(feature = "postgres")]
    pub use crate::store::PostgresStore;

    #[cfg(feature = "mysql")]
    pub use crate::store::MySqlStore;
}
