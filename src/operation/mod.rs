mod column;
mod enumeration;
mod index;
mod sql;
mod table;

pub use column::{AddColumn, AlterColumn, DropColumn, RenameColumn};
pub use enumeration::{CreateEnum, DropEnum};
pub use index::{CreateIndex, DropIndex, Index, IndexOrder};
pub use sql::RunSql;
pub use table::{CreateTable, DropTable, RenameTable};

use thiserror::Error;

use crate::backend::Backend;

/// A single schema change, rendered to SQL for a given dialect.
pub trait Operation: Send + Sync {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation>;

    /// Statements undoing `forward`, or `None` when the operation does not
    /// carry enough information to derive them.
    fn backward(&self, backend: &dyn Backend)
        -> Result<Option<Vec<String>>, UnsupportedOperation>;

    fn describe(&self) -> String;

    fn is_reversible(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{operation} is not supported by the {backend} backend")]
pub struct UnsupportedOperation {
    pub backend: &'static str,
    pub operation: String,
}

impl UnsupportedOperation {
    pub fn new(backend: &'static str, operation: impl Into<String>) -> Self {
        Self {
            backend,
            operation: operation.into(),
        }
    }
}
