//! In-process worksheet used by tests and `console --offline`.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{StoreError, Worksheet};

/// A worksheet held in memory, header row first.
#[derive(Debug)]
pub struct MemoryWorksheet {
    title: String,
    rows: Mutex<Vec<Vec<Value>>>,
}

impl MemoryWorksheet {
    /// Create an empty worksheet with the given header. An empty `header`
    /// leaves the sheet without any rows, like a freshly added tab.
    pub fn new(title: &str, header: &[&str]) -> Self {
        let rows = if header.is_empty() {
            Vec::new()
        } else {
            vec![header
                .iter()
                .map(|h| Value::String((*h).to_owned()))
                .collect()]
        };
        Self {
            title: title.to_owned(),
            rows: Mutex::new(rows),
        }
    }

    /// Builder-style row insertion for fixtures.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.get_mut().push(row);
        self
    }

    /// Number of data rows (header excluded).
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len().saturating_sub(1)
    }

    /// Whether the worksheet has no data rows.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the raw rows, header included.
    pub async fn raw_rows(&self) -> Vec<Vec<Value>> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl Worksheet for MemoryWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    async fn rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        Ok(self.rows.lock().await.clone())
    }

    async fn append_row(&self, values: Vec<Value>) -> Result<(), StoreError> {
        self.rows.lock().await.push(values);
        Ok(())
    }
}
