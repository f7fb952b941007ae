#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Serial,
    BigSerial,
    Integer,
    BigInt,
    SmallInt,
    Text,
    VarChar(usize),
    Boolean,
    Timestamp,
    TimestampTz,
    Date,
    Uuid,
    Json,
    JsonB,
    Real,
    DoublePrecision,
    /// Column typed by a named enumerated type. Postgres refers to the type
    /// by name (see `CreateEnum`), MySQL inlines the variants, SQLite stores text.
    Enum {
        name: String,
        variants: Vec<String>,
    },
}

impl ColumnType {
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        ColumnType::Enum {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, ColumnType::Serial | ColumnType::BigSerial)
    }
}
