use crate::backend::Backend;
use crate::operation::{Operation, UnsupportedOperation};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IndexOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Index {
    pub name: String,
    pub columns: Vec<(String, IndexOrder)>,
    pub unique: bool,
    pub predicate: Option<String>,
}

impl Index {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: false,
            predicate: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push((name.into(), IndexOrder::Asc));
        self
    }

    pub fn column_desc(mut self, name: impl Into<String>) -> Self {
        self.columns.push((name.into(), IndexOrder::Desc));
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Restricts the index to rows matching a raw SQL predicate.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CreateIndex {
    pub table: String,
    pub index: Index,
}

impl CreateIndex {
    pub fn new(table: impl Into<String>, index: Index) -> Self {
        Self {
            table: table.into(),
            index,
        }
    }
}

impl Operation for CreateIndex {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.create_index_sql(&self.table, &self.index)?])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(vec![
            backend.drop_index_sql(&self.table, &self.index.name)
        ]))
    }

    fn describe(&self) -> String {
        format!("Create index {} on {}", self.index.name, self.table)
    }
}

#[derive(Debug, Clone)]
pub struct DropIndex {
    pub table: String,
    pub name: String,
    pub definition: Option<Index>,
}

impl DropIndex {
    pub fn new(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            definition: None,
        }
    }

    pub fn with_definition(mut self, index: Index) -> Self {
        self.definition = Some(index);
        self
    }
}

impl Operation for DropIndex {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(vec![backend.drop_index_sql(&self.table, &self.name)])
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        self.definition
            .as_ref()
            .map(|index| Ok(vec![backend.create_index_sql(&self.table, index)?]))
            .transpose()
    }

    fn describe(&self) -> String {
        format!("Drop index {} from {}", self.name, self.table)
    }

    fn is_reversible(&self) -> bool {
        self.definition.is_some()
    }
}
