use super::Error;
use bytes::Bytes;

/// Widths (in bytes) of the columns of every row stored in a [super::Table].
///
/// The first column is the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    widths: Vec<usize>,
}

impl Schema {
    pub fn new(widths: Vec<usize>) -> Self {
        Self { widths }
    }

    /// Check that the schema can be persisted in a table header.
    pub fn validate(&self) -> Result<(), Error> {
        if self.widths.is_empty() {
            return Err(Error::InvalidSchema("no columns".into()));
        }
        if self.widths.len() > u16::MAX as usize {
            return Err(Error::InvalidSchema(format!(
                "too many columns: {}",
                self.widths.len()
            )));
        }
        for (column, width) in self.widths.iter().enumerate() {
            if *width == 0 || *width > u32::MAX as usize {
                return Err(Error::InvalidSchema(format!(
                    "column {column} has invalid width {width}"
                )));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> usize {
        self.widths.len()
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn key_width(&self) -> usize {
        self.widths.first().copied().unwrap_or(0)
    }

    /// Sum of all column widths.
    pub fn row_width(&self) -> usize {
        self.widths.iter().sum()
    }
}

/// A row of byte columns. Column 0 is the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    columns: Vec<Bytes>,
}

impl Row {
    pub fn new(columns: Vec<Bytes>) -> Self {
        Self { columns }
    }

    /// The key of the row (empty if the row has no columns).
    pub fn key(&self) -> &[u8] {
        self.columns.first().map(|key| key.as_ref()).unwrap_or(&[])
    }

    pub fn column(&self, index: usize) -> Option<&Bytes> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[Bytes] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Bytes> {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether every column has exactly the width required by `schema`.
    pub fn matches(&self, schema: &Schema) -> bool {
        self.columns.len() == schema.columns()
            && self
                .columns
                .iter()
                .zip(schema.widths())
                .all(|(column, width)| column.len() == *width)
    }

    pub(super) fn widths(&self) -> Vec<usize> {
        self.columns.iter().map(Bytes::len).collect()
    }

    /// Split a contiguous buffer into columns according to `schema`.
    pub(super) fn split(buf: Bytes, schema: &Schema) -> Self {
        let mut columns = Vec::with_capacity(schema.columns());
        let mut offset = 0;
        for width in schema.widths() {
            columns.push(buf.slice(offset..offset + width));
            offset += width;
        }
        Self { columns }
    }
}
