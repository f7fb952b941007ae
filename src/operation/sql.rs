use std::collections::BTreeMap;

use crate::backend::Backend;
use crate::operation::{Operation, UnsupportedOperation};

#[derive(Debug, Clone)]
enum Statements {
    /// Same statements everywhere, optionally restricted to some dialects.
    Shared {
        sql: Vec<String>,
        only: Option<Vec<String>>,
    },
    PerBackend(BTreeMap<String, Vec<String>>),
}

impl Statements {
    fn resolve(&self, backend: &dyn Backend) -> Option<Vec<String>> {
        match self {
            Statements::Shared { sql, only } => match only {
                Some(only) if !only.iter().any(|name| name == backend.name()) => Some(vec![]),
                _ => Some(sql.clone()),
            },
            Statements::PerBackend(map) => map.get(backend.name()).cloned(),
        }
    }
}

/// Raw SQL, typically a data backfill between two DDL operations.
#[derive(Debug, Clone)]
pub struct RunSql {
    forward: Statements,
    backward: Option<Statements>,
    description: String,
}

impl RunSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            forward: Statements::Shared {
                sql: vec![sql.into()],
                only: None,
            },
            backward: None,
            description: "Run custom SQL".to_string(),
        }
    }

    pub fn reversible(forward: impl Into<String>, backward: impl Into<String>) -> Self {
        Self::new(forward).with_reverse(backward)
    }

    /// Statements supplied per dialect with `for_backend`; rendering for a
    /// dialect without an entry fails with `UnsupportedOperation`.
    pub fn per_backend() -> Self {
        Self {
            forward: Statements::PerBackend(BTreeMap::new()),
            backward: None,
            description: "Run dialect-specific SQL".to_string(),
        }
    }

    pub fn for_backend(mut self, backend: &str, sql: impl Into<String>) -> Self {
        if let Statements::PerBackend(ref mut map) = self.forward {
            map.insert(backend.to_string(), vec![sql.into()]);
        }
        self
    }

    /// Skip this operation on every dialect not listed.
    pub fn only_for(mut self, backends: &[&str]) -> Self {
        let names: Vec<String> = backends.iter().map(|name| name.to_string()).collect();
        for statements in std::iter::once(&mut self.forward).chain(self.backward.as_mut()) {
            if let Statements::Shared { ref mut only, .. } = *statements {
                *only = Some(names.clone());
            }
        }
        self
    }

    pub fn with_reverse(mut self, sql: impl Into<String>) -> Self {
        let only = match self.forward {
            Statements::Shared { ref only, .. } => only.clone(),
            Statements::PerBackend(_) => None,
        };
        self.backward = Some(Statements::Shared {
            sql: vec![sql.into()],
            only,
        });
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Operation for RunSql {
    fn forward(&self, backend: &dyn Backend) -> Result<Vec<String>, UnsupportedOperation> {
        self.forward
            .resolve(backend)
            .ok_or_else(|| UnsupportedOperation::new(backend.name(), self.description.clone()))
    }

    fn backward(
        &self,
        backend: &dyn Backend,
    ) -> Result<Option<Vec<String>>, UnsupportedOperation> {
        match self.backward {
            Some(ref statements) => statements.resolve(backend).map(Some).ok_or_else(|| {
                UnsupportedOperation::new(backend.name(), self.description.clone())
            }),
            None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn is_reversible(&self) -> bool {
        self.backward.is_some()
    }
}
