use crate::backend::Backend;
use crate::operation::{Operation, UnsupportedOperation};

/// Creates a named enumerated type. Renders nothing on dialects without
/// standalone types, where `ColumnType::Enum` columns carry the variants.
#[derive(Debug, Clone)]
pub struct CreateEnum {
    pub name: String,
    pub variants: Vec<String>,
}

impl CreateEnum {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

impl Operation for CreateEnum {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(backend
            .create_enum_sql(&self.name, &self.variants)
            .into_iter()
            .collect())
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(Some(
            backend.drop_enum_sql(&self.name).into_iter().collect(),
        ))
    }

    fn describe(&self) -> String {
        format!("Create enum {}", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct DropEnum {
    pub name: String,
    pub variants: Option<Vec<String>>,
}

impl DropEnum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: None,
        }
    }

    pub fn with_variants<S: Into<String>>(mut self, variants: impl IntoIterator<Item = S>) -> Self {
        self.variants = Some(variants.into_iter().map(Into::into).collect());
        self
    }
}

impl Operation for DropEnum {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        Ok(backend.drop_enum_sql(&self.name).into_iter().collect())
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        Ok(self.variants.as_ref().map(|variants| {
            backend
                .create_enum_sql(&self.name, variants)
                .into_iter()
                .collect()
        }))
    }

    fn describe(&self) -> String {
        format!("Drop enum {}", self.name)
    }

    fn is_reversible(&self) -> bool {
        self.variants.is_some()
    }
}
