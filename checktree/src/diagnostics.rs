//! Per-run diagnostics sink.
//!
//! Collects contract violations and malformed input seen during one run and
//! mirrors each entry as a `tracing` event. Clones share the same buffer, so a
//! sink can be handed to the scheduler and to every completion handle of the
//! run while the caller keeps its own copy for inspection.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Root of the work tree was not a group; the run produced no report.
    MalformedRoot,
    /// Entry held a value that is neither a unit nor a group.
    InvalidValue,
    /// Unit signalled again after succeeding.
    DuplicatedCall,
    /// Signal arrived after a failure and was dropped.
    IgnoredSignal,
    /// Signal arrived after the outcome was attached to its parent.
    LateSignal,
    /// Unit dropped every completion handle without signalling.
    CompletionDropped,
    /// Scheduler was asked to complete an entry that was not running.
    RepeatedCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub key: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: DiagnosticKind, key: &str, detail: impl Into<String>) {
        let detail = detail.into();
        match kind {
            DiagnosticKind::MalformedRoot => error!(?kind, key, %detail, "run aborted"),
            _ => warn!(?kind, key, %detail, "unit contract violation"),
        }
        self.lock().push(Diagnostic {
            kind,
            key: key.to_string(),
            detail,
        });
    }

    pub fn error_count(&self) -> usize {
        self.lock().len()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.lock().iter().filter(|entry| entry.kind == kind).count()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // Entries are append-only, so a poisoned buffer is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
