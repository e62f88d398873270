//! Tabular store adapters: the user directory and the report sheet.
//!
//! Both sit on the [`Worksheet`] trait, which hands back raw rows. [`Table`]
//! reads them the way gspread's `get_all_records` does: the first row is the
//! header and every following row becomes a header-keyed [`Record`]. Two
//! backends exist:
//! - [`sheets::SheetsWorksheet`]: Google Sheets REST API
//! - [`memory::MemoryWorksheet`]: in-process table for tests and offline runs

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ColumnsConfig;

pub mod memory;
pub mod sheets;

/// A header-keyed worksheet row.
pub type Record = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by worksheet backends and the adapters on top of them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP transport failure.
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("store returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Service account credentials are unusable.
    #[error("store authentication failed: {0}")]
    Auth(String),
    /// Response did not match the expected schema.
    #[error("store response parse error: {0}")]
    Parse(String),
    /// A configured header is not present in the worksheet.
    #[error("worksheet '{worksheet}' has no column '{column}'")]
    MissingColumn {
        /// Worksheet title.
        worksheet: String,
        /// Missing header name.
        column: String,
    },
}

// ---------------------------------------------------------------------------
// Worksheet trait
// ---------------------------------------------------------------------------

/// A single worksheet of the external tabular store.
#[async_trait]
pub trait Worksheet: Send + Sync {
    /// Worksheet title, used in logs and errors.
    fn title(&self) -> &str;

    /// Every row as stored, header row first. An empty sheet yields no rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    async fn rows(&self) -> Result<Vec<Vec<Value>>, StoreError>;

    /// Append one row after the last non-empty row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend rejects the write.
    async fn append_row(&self, values: Vec<Value>) -> Result<(), StoreError>;
}

/// One read of a worksheet: its header and the header-keyed data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    header: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    /// Split raw rows (header first) into header and records.
    ///
    /// Short rows are padded with empty strings and fully blank rows are
    /// dropped.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let mut rows = rows.into_iter();
        let header: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(cell_to_string).collect(),
            None => return Self::default(),
        };

        let records = rows
            .filter(|row| row.iter().any(|cell| !cell_to_string(cell).is_empty()))
            .map(|row| {
                let mut cells = row.into_iter();
                header
                    .iter()
                    .map(|key| {
                        let value = cells.next().unwrap_or_else(|| Value::String(String::new()));
                        (key.clone(), value)
                    })
                    .collect()
            })
            .collect();

        Self { header, records }
    }

    /// Header cells, normalized. Empty when the sheet has no rows at all.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows in sheet order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Zero-based position of `name` in the header.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` when the header lacks `name`, including when
    /// the sheet has no header row.
    pub fn position(&self, worksheet: &str, name: &str) -> Result<usize, StoreError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| StoreError::MissingColumn {
                worksheet: worksheet.to_owned(),
                column: name.to_owned(),
            })
    }
}

async fn read_table(sheet: &dyn Worksheet) -> Result<Table, StoreError> {
    Ok(Table::from_rows(sheet.rows().await?))
}

/// Render a cell as a normalized string.
///
/// Text is trimmed; integral numbers render without a fractional part, so a
/// stored `123` or `123.0` compares equal to an inbound `"123"`.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
                    _ => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Normalize an inbound identifier the same way stored cells are.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_owned()
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A facilitator known to the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    /// Stable sender identifier (normalized string form).
    pub identifier: String,
    /// Display name as stored in the directory.
    pub display_name: String,
}

/// One submitted activity report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    /// Activity date as written in the sheet.
    pub date: String,
    /// Participant count as written in the sheet.
    pub participants: String,
    /// Validation status.
    pub validation: String,
    /// Free-form remark.
    pub remark: String,
    /// Facilitator who owns the report.
    pub owner: String,
}

/// Result of [`UserDirectory::register_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Name stored in the directory: the existing one, or the name just
    /// written.
    pub display_name: String,
    /// Whether a new row was appended.
    pub created: bool,
}

// ---------------------------------------------------------------------------
// User directory adapter
// ---------------------------------------------------------------------------

/// Identifier → display name lookup with first-contact registration.
#[derive(Clone)]
pub struct UserDirectory {
    sheet: Arc<dyn Worksheet>,
    identifier_column: String,
    name_column: String,
}

/// Column positions of the directory columns within the header.
#[derive(Debug, Clone, Copy)]
struct DirectoryLayout {
    identifier: usize,
    name: usize,
    width: usize,
}

impl UserDirectory {
    /// Wrap a worksheet whose header contains the given columns.
    pub fn new(sheet: Arc<dyn Worksheet>, columns: &ColumnsConfig) -> Self {
        Self {
            sheet,
            identifier_column: columns.identifier.clone(),
            name_column: columns.name.clone(),
        }
    }

    /// Check that the worksheet header carries both directory columns.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` for a missing header or column, or any read
    /// failure.
    pub async fn verify_layout(&self) -> Result<(), StoreError> {
        let table = read_table(&*self.sheet).await?;
        self.layout(&table).map(|_| ())
    }

    /// Look up the display name registered for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read.
    pub async fn resolve(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        let table = read_table(&*self.sheet).await?;
        self.layout(&table)?;
        Ok(self
            .find(&table, identifier)
            .map(|user| user.display_name))
    }

    /// Register `identifier` unless it is already present, and return the
    /// name the directory holds for it afterwards.
    ///
    /// The new row is laid out by header position, so column order in the
    /// sheet is free. Nothing is written when the header lacks a directory
    /// column. The check and the append are separate calls; two
    /// simultaneous first contacts may both append.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory cannot be read or written,
    /// or its header lacks a configured column.
    pub async fn register_if_absent(
        &self,
        identifier: &str,
        name: &str,
    ) -> Result<Registration, StoreError> {
        let identifier = normalize_identifier(identifier);
        let table = read_table(&*self.sheet).await?;
        let layout = self.layout(&table)?;

        if let Some(user) = self.find(&table, &identifier) {
            debug!(identifier = %identifier, "user already registered");
            return Ok(Registration {
                display_name: user.display_name,
                created: false,
            });
        }

        let mut row = vec![Value::String(String::new()); layout.width];
        if let Some(cell) = row.get_mut(layout.identifier) {
            *cell = Value::String(identifier.clone());
        }
        if let Some(cell) = row.get_mut(layout.name) {
            *cell = Value::String(name.to_owned());
        }
        self.sheet.append_row(row).await?;
        info!(identifier = %identifier, name, "registered new facilitator");

        Ok(Registration {
            display_name: name.to_owned(),
            created: true,
        })
    }

    fn layout(&self, table: &Table) -> Result<DirectoryLayout, StoreError> {
        let title = self.sheet.title();
        Ok(DirectoryLayout {
            identifier: table.position(title, &self.identifier_column)?,
            name: table.position(title, &self.name_column)?,
            width: table.header().len(),
        })
    }

    /// First row whose identifier cell matches. Call after [`Self::layout`]
    /// succeeded, so both columns are keys of every record.
    fn find(&self, table: &Table, identifier: &str) -> Option<RegisteredUser> {
        let wanted = normalize_identifier(identifier);
        table.records().iter().find_map(|record| {
            let stored = record.get(&self.identifier_column).map(cell_to_string)?;
            if stored != wanted {
                return None;
            }
            let display_name = record
                .get(&self.name_column)
                .map(cell_to_string)
                .unwrap_or_default();
            Some(RegisteredUser {
                identifier: stored,
                display_name,
            })
        })
    }
}

impl std::fmt::Debug for UserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDirectory")
            .field("worksheet", &self.sheet.title())
            .field("identifier_column", &self.identifier_column)
            .field("name_column", &self.name_column)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Report query adapter
// ---------------------------------------------------------------------------

/// Read-only access to the report worksheet.
#[derive(Clone)]
pub struct ReportQuery {
    sheet: Arc<dyn Worksheet>,
    columns: ColumnsConfig,
}

impl ReportQuery {
    /// Wrap the report worksheet.
    pub fn new(sheet: Arc<dyn Worksheet>, columns: ColumnsConfig) -> Self {
        Self { sheet, columns }
    }

    /// Check that the worksheet header carries every report column.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` for a missing header or column, or any read
    /// failure.
    pub async fn verify_layout(&self) -> Result<(), StoreError> {
        let table = read_table(&*self.sheet).await?;
        self.check_columns(&table)
    }

    /// All reports whose owner equals `display_name` exactly, in sheet order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the sheet cannot be read or lacks a column.
    pub async fn reports_for(&self, display_name: &str) -> Result<Vec<ReportRecord>, StoreError> {
        let table = read_table(&*self.sheet).await?;
        self.check_columns(&table)?;

        let reports: Vec<ReportRecord> = table
            .records()
            .iter()
            .filter(|record| field(record, &self.columns.name) == display_name)
            .map(|record| ReportRecord {
                date: field(record, &self.columns.date),
                participants: field(record, &self.columns.participants),
                validation: field(record, &self.columns.validation),
                remark: field(record, &self.columns.remark),
                owner: field(record, &self.columns.name),
            })
            .collect();
        debug!(owner = display_name, count = reports.len(), "reports filtered");
        Ok(reports)
    }

    fn check_columns(&self, table: &Table) -> Result<(), StoreError> {
        let title = self.sheet.title();
        for name in [
            &self.columns.name,
            &self.columns.date,
            &self.columns.participants,
            &self.columns.validation,
            &self.columns.remark,
        ] {
            table.position(title, name)?;
        }
        Ok(())
    }
}

fn field(record: &Record, name: &str) -> String {
    record.get(name).map(cell_to_string).unwrap_or_default()
}

impl std::fmt::Debug for ReportQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportQuery")
            .field("worksheet", &self.sheet.title())
            .finish()
    }
}
