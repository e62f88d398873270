//! Hand-written collaborators shared by the dispatcher-level tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use fasilbot::bot::{ChatForwarder, Dispatcher, InboundMessage};
use fasilbot::config::ColumnsConfig;
use fasilbot::persona::{PersonaBuilder, PersonaParams};
use fasilbot::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, StopReason, UsageStats,
};
use fasilbot::recap::{RecapOutcome, RecapService};
use fasilbot::store::memory::MemoryWorksheet;
use fasilbot::store::{ReportQuery, StoreError, UserDirectory, Worksheet};

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Replies with a fixed text (or fails) and records every request.
pub struct ScriptedProvider {
    reply: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_owned()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("provider should have been called")
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request);
        match &self.reply {
            Some(text) => Ok(CompletionResponse {
                text: text.clone(),
                stop_reason: StopReason::EndTurn,
                usage: UsageStats::default(),
                model: "scripted".to_owned(),
            }),
            None => Err(ProviderError::HttpStatus {
                status: 500,
                body: "upstream exploded".to_owned(),
            }),
        }
    }

    fn model_id(&self) -> &str {
        "test/scripted"
    }
}

// ---------------------------------------------------------------------------
// Recap
// ---------------------------------------------------------------------------

/// Returns a fixed outcome and records `(identifier, display_name)` pairs.
pub struct RecordingRecap {
    outcome: RecapOutcome,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingRecap {
    pub fn new(outcome: RecapOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl RecapService for RecordingRecap {
    async fn trigger_recap(&self, identifier: &str, display_name: &str) -> RecapOutcome {
        self.calls
            .lock()
            .expect("calls lock")
            .push((identifier.to_owned(), display_name.to_owned()));
        self.outcome.clone()
    }
}

// ---------------------------------------------------------------------------
// Worksheets
// ---------------------------------------------------------------------------

/// A worksheet whose backend is always down.
pub struct FailingWorksheet;

#[async_trait]
impl Worksheet for FailingWorksheet {
    fn title(&self) -> &str {
        "Broken"
    }

    async fn rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        Err(StoreError::HttpStatus {
            status: 503,
            body: "backend unavailable".to_owned(),
        })
    }

    async fn append_row(&self, _values: Vec<Value>) -> Result<(), StoreError> {
        Err(StoreError::HttpStatus {
            status: 503,
            body: "backend unavailable".to_owned(),
        })
    }
}

/// Wraps a memory worksheet and counts reads, to keep an eye on API quota.
pub struct CountingWorksheet {
    inner: MemoryWorksheet,
    reads: AtomicUsize,
}

impl CountingWorksheet {
    pub fn new(inner: MemoryWorksheet) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl Worksheet for CountingWorksheet {
    fn title(&self) -> &str {
        self.inner.title()
    }

    async fn rows(&self) -> Result<Vec<Vec<Value>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.rows().await
    }

    async fn append_row(&self, values: Vec<Value>) -> Result<(), StoreError> {
        self.inner.append_row(values).await
    }
}

pub fn user_sheet() -> MemoryWorksheet {
    MemoryWorksheet::new("UserList", &["Chat ID", "Nama Fasilitator"])
}

pub fn report_sheet() -> MemoryWorksheet {
    MemoryWorksheet::new(
        "Laporan",
        &[
            "Tanggal",
            "Total Peserta",
            "Validasi",
            "Keterangan",
            "Nama Fasilitator",
        ],
    )
}

/// The three-facilitator report fixture.
pub fn sample_reports() -> MemoryWorksheet {
    report_sheet()
        .with_row(vec![
            json!("2024-05-01"),
            json!(12),
            json!("Valid"),
            json!("Lancar"),
            json!("Ayu"),
        ])
        .with_row(vec![
            json!("2024-05-02"),
            json!(20),
            json!("Valid"),
            json!("Ramai"),
            json!("Budi"),
        ])
        .with_row(vec![
            json!("2024-05-03"),
            json!(8),
            json!("Pending"),
            json!("Hujan"),
            json!("Ayu"),
        ])
}

pub fn persona_params() -> PersonaParams {
    PersonaParams {
        bot_name: "FasilBot".to_owned(),
        report_form_url: "https://forms.example.org/laporan".to_owned(),
        documentation_form_url: "https://forms.example.org/dokumentasi".to_owned(),
        escalation_contact: "koordinator wilayah".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A dispatcher plus handles on every collaborator it was built from.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub provider: Arc<ScriptedProvider>,
    pub recap: Arc<RecordingRecap>,
}

pub fn harness_with(
    users: Arc<dyn Worksheet>,
    reports: Arc<dyn Worksheet>,
    provider: ScriptedProvider,
    outcome: RecapOutcome,
) -> Harness {
    let columns = ColumnsConfig::default();
    let provider = Arc::new(provider);
    let recap = Arc::new(RecordingRecap::new(outcome));

    let directory = UserDirectory::new(users, &columns);
    let forwarder = ChatForwarder::new(PersonaBuilder::new(persona_params()), provider.clone());
    let dispatcher = Dispatcher::new(
        directory,
        ReportQuery::new(reports, columns),
        recap.clone(),
        forwarder,
    );

    Harness {
        dispatcher,
        provider,
        recap,
    }
}

pub fn message(sender_id: &str, name: &str, text: &str) -> InboundMessage {
    InboundMessage {
        sender_id: sender_id.to_owned(),
        sender_display_name: name.to_owned(),
        text: text.to_owned(),
    }
}
