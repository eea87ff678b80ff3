//! Table sources.
//!
//! A `TableSource` names a table and opens a raw row stream over it; the
//! orchestrator never sees anything below this seam. `InMemoryTable` is
//! the bundled source for inline data and for tests; file and remote
//! sources implement the same pair of traits.

use tabcheck_core::{Schema, ValidationError, Value};

/// A table that can be validated.
pub trait TableSource: Send + Sync {
    /// Source identifier used in reports (a path, a URL, a name).
    fn name(&self) -> &str;

    /// Access scheme, e.g. "file" or "memory".
    fn scheme(&self) -> &str;

    /// Data format, e.g. "csv" or "inline".
    fn format(&self) -> &str;

    /// Character encoding of the underlying data.
    fn encoding(&self) -> &str {
        "utf-8"
    }

    /// Declared schema, if the source carries one.
    fn schema(&self) -> Option<&Schema>;

    /// Opens a fresh raw row stream.
    fn open(&self) -> Result<Box<dyn TableStream + '_>, ValidationError>;
}

/// An open raw row stream.
pub trait TableStream {
    /// Header labels, if the stream carries a header row. The header
    /// occupies the first physical position when present.
    fn headers(&self) -> Option<&[String]>;

    /// The next raw data row, or `None` at end of stream.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>, ValidationError>;
}

/// An inline table held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTable {
    name: String,
    headers: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    schema: Option<Schema>,
}

impl InMemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the header row.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Appends one data row.
    pub fn with_row(mut self, row: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Attaches a declared schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

impl TableSource for InMemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn scheme(&self) -> &str {
        "memory"
    }

    fn format(&self) -> &str {
        "inline"
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn open(&self) -> Result<Box<dyn TableStream + '_>, ValidationError> {
        Ok(Box::new(InMemoryStream {
            table: self,
            cursor: 0,
        }))
    }
}

struct InMemoryStream<'a> {
    table: &'a InMemoryTable,
    cursor: usize,
}

impl TableStream for InMemoryStream<'_> {
    fn headers(&self) -> Option<&[String]> {
        self.table.headers.as_deref()
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>, ValidationError> {
        let row = self.table.rows.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(row)
    }
}
