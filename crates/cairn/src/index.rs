//! Index tables: collected entries laid out as rows and columns.

use crate::error::{LayoutError, Result};
use crate::types::{Entry, Metadata};
use indexmap::IndexSet;
use std::io::Write;

/// Column holding the root-prefixed path when `add_filepath` is set.
pub const FILEPATH_COLUMN: &str = "filepath";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Columns moved to the front of the table, in this order
    pub index_fields: Vec<String>,
    /// Append a `filepath` column with each entry's full path
    pub add_filepath: bool,
}

/// Metadata of many entries as one table.
///
/// Columns are the union of all metadata keys in first-seen order; cells for
/// keys an entry lacks are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl IndexTable {
    /// Build a table, stopping at the first error in `entries`.
    ///
    /// With `add_filepath`, the `filepath` column comes after every metadata
    /// column unless it is listed in `index_fields`. A metadata field already
    /// named `filepath` is a [`LayoutError::ColumnConflict`].
    pub fn from_entries<I>(entries: I, options: &IndexOptions) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Entry>>,
    {
        let mut seen: IndexSet<String> = IndexSet::new();
        let mut records: Vec<(Metadata, String)> = Vec::new();

        for entry in entries {
            let Entry { path, metadata } = entry?;
            if options.add_filepath && metadata.contains_key(FILEPATH_COLUMN) {
                return Err(LayoutError::ColumnConflict(FILEPATH_COLUMN.to_string()));
            }
            for key in metadata.keys() {
                if !seen.contains(key) {
                    seen.insert(key.to_string());
                }
            }
            records.push((metadata, path.as_path().to_string_lossy().into_owned()));
        }

        let is_filepath = |column: &str| options.add_filepath && column == FILEPATH_COLUMN;

        let mut columns = Vec::with_capacity(seen.len() + 1);
        for field in &options.index_fields {
            if !records.is_empty() && !seen.contains(field) && !is_filepath(field.as_str()) {
                return Err(LayoutError::UnknownIndexField(field.clone()));
            }
            columns.push(field.clone());
        }
        columns.extend(
            seen.into_iter()
                .filter(|column| !options.index_fields.contains(column)),
        );
        if options.add_filepath && !options.index_fields.iter().any(|f| f == FILEPATH_COLUMN) {
            columns.push(FILEPATH_COLUMN.to_string());
        }

        let rows = records
            .iter()
            .map(|(record, filepath)| {
                columns
                    .iter()
                    .map(|column| {
                        if is_filepath(column.as_str()) {
                            Some(filepath.clone())
                        } else {
                            record.get(column).map(str::to_string)
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row[idx].as_deref()).collect())
    }

    /// Write the table as CSV with a header row; missing cells are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
