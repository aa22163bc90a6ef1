//! Sequential execution of a work tree.
//!
//! The scheduler clones the caller's tree into a [`WorkingCopy`], then drains
//! it one entry at a time: groups recurse, units run with a fresh
//! [`Completion`] handle, invalid values become failed outcomes. Exactly one
//! unit is in flight at any moment, and the scheduler yields to the runtime
//! between entries so long sibling lists neither grow the stack nor starve
//! other tasks.

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::core::aggregate::Aggregate;
use crate::core::cloner::{CloneError, Entry, WorkingCopy, clone_tree};
use crate::core::outcome::{COMPLETION_DROPPED, Outcome, Signal, Transition};
use crate::core::report::Report;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::work::{Completion, Unit, WorkItem, value_kind};

/// Root key while the run is in progress.
pub const PENDING_KEY: &str = "<pending>";
/// Root key after a run with no failed entries.
pub const SUCCESS_KEY: &str = "success";
/// Root key after a run with at least one failed entry.
pub const FAILURE_KEY: &str = "failure";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("malformed work tree: {0}")]
    Malformed(#[from] CloneError),
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    diagnostics: Diagnostics,
}

impl Scheduler {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run every unit in `tree` once and return the root report.
    ///
    /// A root that is not a group is the only fatal error. Everything else is
    /// recorded as a failed outcome inside the report.
    #[instrument(skip_all)]
    pub async fn run(&self, tree: &WorkItem) -> Result<Aggregate, RunError> {
        let copy = match clone_tree(tree) {
            Ok(copy) => copy,
            Err(err) => {
                self.diagnostics
                    .record(DiagnosticKind::MalformedRoot, PENDING_KEY, err.to_string());
                return Err(err.into());
            }
        };

        info!(entries = copy.remaining(), "run started");
        let mut root = self.run_group(PENDING_KEY.to_string(), copy).await;
        let marker = if root.failed() {
            FAILURE_KEY
        } else {
            SUCCESS_KEY
        };
        root.set_key(marker);
        info!(result = marker, "run finished");
        Ok(root)
    }

    /// Callback form of [`Scheduler::run`]. `callback` is invoked exactly once,
    /// including when the root is malformed.
    pub async fn run_with<F>(&self, tree: &WorkItem, callback: F)
    where
        F: FnOnce(Result<Aggregate, RunError>),
    {
        callback(self.run(tree).await);
    }

    fn run_group(&self, key: String, mut copy: WorkingCopy) -> BoxFuture<'_, Aggregate> {
        Box::pin(async move {
            let mut aggregate = Aggregate::new(key);
            while let Some((slot, key, entry)) = copy.take_next() {
                let report = match entry {
                    Entry::Group(group) => {
                        debug!(key = %key, "entering group");
                        Report::Aggregate(self.run_group(key.clone(), group).await)
                    }
                    Entry::Unit(unit) => Report::Outcome(self.run_unit(&key, &unit).await),
                    Entry::Invalid(value) => {
                        self.diagnostics.record(
                            DiagnosticKind::InvalidValue,
                            &key,
                            format!("found {}", value_kind(&value)),
                        );
                        Report::Outcome(Outcome::invalid_value(&key))
                    }
                };
                aggregate.add(report);

                if !copy.complete(slot) {
                    self.diagnostics.record(
                        DiagnosticKind::RepeatedCompletion,
                        &key,
                        "entry was not running",
                    );
                }
                tokio::task::yield_now().await;
            }
            aggregate
        })
    }

    /// Run one unit until its first signal, then fold in any signals the body
    /// sends before its next suspension. A body still running after that is
    /// detached, and whatever it signals later is recorded as a late signal.
    #[instrument(skip(self, unit))]
    async fn run_unit(&self, key: &str, unit: &Unit) -> Outcome {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut outcome = Outcome::new(key);
        let mut task = unit.start(Completion::new(key, tx, self.diagnostics.clone()));
        let mut task_done = false;

        let first = loop {
            tokio::select! {
                biased;
                signal = rx.recv() => break signal,
                () = &mut task, if !task_done => task_done = true,
            }
        };

        match first {
            Some(signal) => self.apply(&mut outcome, signal),
            None => {
                self.diagnostics
                    .record(DiagnosticKind::CompletionDropped, key, COMPLETION_DROPPED);
                self.apply(&mut outcome, Err(Value::String(COMPLETION_DROPPED.to_string())));
            }
        }

        if !task_done {
            tokio::select! {
                biased;
                () = &mut task => task_done = true,
                () = tokio::task::yield_now() => {}
            }
        }
        while let Ok(signal) = rx.try_recv() {
            self.apply(&mut outcome, signal);
        }
        drop(rx);

        if !task_done {
            debug!("unit still running after its signal, detaching");
            tokio::spawn(task);
        }

        debug!(state = ?outcome.state, "unit settled");
        outcome
    }

    fn apply(&self, outcome: &mut Outcome, signal: Signal) {
        match outcome.apply(signal) {
            Transition::Settled => {}
            Transition::Violation => self.diagnostics.record(
                DiagnosticKind::DuplicatedCall,
                &outcome.key,
                "signal after success",
            ),
            Transition::Ignored => self.diagnostics.record(
                DiagnosticKind::IgnoredSignal,
                &outcome.key,
                "signal after failure",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::{DUPLICATED_CALL, INVALID_VALUE, OutcomeState};
    use crate::test_support::{fail, mixed_tree, signal_twice, silent, succeed};
    use crate::work::WorkTree;
    use serde_json::json;

    fn outcome<'a>(root: &'a Aggregate, path: &str) -> &'a Outcome {
        root.find(path)
            .and_then(Report::as_outcome)
            .unwrap_or_else(|| panic!("missing outcome {path}"))
    }

    #[tokio::test]
    async fn mixed_tree_reports_nested_failure() {
        let scheduler = Scheduler::default();
        let root = scheduler
            .run(&mixed_tree().into())
            .await
            .expect("run");

        assert!(root.failed());
        assert!(!root.succeeded());
        assert_eq!(root.key(), FAILURE_KEY);

        let a = outcome(&root, "a");
        assert!(a.succeeded());
        assert_eq!(a.message, json!("a"));

        let b = root.get("b").expect("b");
        assert!(b.failed());
        assert_eq!(outcome(&root, "b/c").message, json!("c"));
        assert!(outcome(&root, "b/c").succeeded());
        assert!(outcome(&root, "b/e").failed());
        assert_eq!(outcome(&root, "b/e").message, json!("e"));
        assert!(scheduler.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn empty_tree_is_unknown_and_marked_success() {
        let root = Scheduler::default()
            .run(&WorkTree::new().into())
            .await
            .expect("run");
        assert!(!root.succeeded());
        assert!(!root.failed());
        assert_eq!(root.state(), OutcomeState::Unknown);
        assert_eq!(root.key(), SUCCESS_KEY);
    }

    #[tokio::test]
    async fn all_falsy_tree_completes_empty() {
        let tree = WorkTree::new()
            .with("a", json!(null))
            .with("b", json!(false))
            .with("c", json!(""));
        let root = Scheduler::default().run(&tree.into()).await.expect("run");
        assert!(root.is_empty());
        assert_eq!(root.state(), OutcomeState::Unknown);
    }

    #[tokio::test]
    async fn invalid_leaf_becomes_failed_outcome() {
        let scheduler = Scheduler::default();
        let tree = WorkTree::new()
            .with("ok", succeed(1))
            .with("text", json!("not a unit"));
        let root = scheduler.run(&tree.into()).await.expect("run");

        let text = outcome(&root, "text");
        assert!(text.failed());
        assert_eq!(text.message, json!(INVALID_VALUE));
        assert!(outcome(&root, "ok").succeeded());
        assert!(root.failed());
        assert_eq!(
            scheduler.diagnostics().count(DiagnosticKind::InvalidValue),
            1
        );
    }

    #[tokio::test]
    async fn double_success_is_invalid() {
        let scheduler = Scheduler::default();
        let tree = WorkTree::new().with("twice", signal_twice(Ok(json!(1)), Ok(json!(2))));
        let root = scheduler.run(&tree.into()).await.expect("run");

        let twice = outcome(&root, "twice");
        assert_eq!(twice.state, OutcomeState::Invalid);
        assert!(twice.succeeded());
        assert!(twice.failed());
        assert_eq!(twice.message, json!(DUPLICATED_CALL));
        assert!(root.failed());
        assert_eq!(
            scheduler.diagnostics().count(DiagnosticKind::DuplicatedCall),
            1
        );
    }

    #[tokio::test]
    async fn failure_then_success_keeps_failure() {
        let scheduler = Scheduler::default();
        let tree = WorkTree::new().with("flaky", signal_twice(Err(json!("no")), Ok(json!("yes"))));
        let root = scheduler.run(&tree.into()).await.expect("run");

        let flaky = outcome(&root, "flaky");
        assert_eq!(flaky.state, OutcomeState::Failure);
        assert_eq!(flaky.message, json!("no"));
        assert_eq!(
            scheduler.diagnostics().count(DiagnosticKind::IgnoredSignal),
            1
        );
    }

    #[tokio::test]
    async fn dropped_completion_fails_unit() {
        let scheduler = Scheduler::default();
        let tree = WorkTree::new().with("quiet", silent()).with("after", succeed(2));
        let root = scheduler.run(&tree.into()).await.expect("run");

        let quiet = outcome(&root, "quiet");
        assert!(quiet.failed());
        assert_eq!(quiet.message, json!(COMPLETION_DROPPED));
        assert!(outcome(&root, "after").succeeded());
        assert_eq!(
            scheduler.diagnostics().count(DiagnosticKind::CompletionDropped),
            1
        );
    }

    #[tokio::test]
    async fn malformed_root_is_an_error() {
        let scheduler = Scheduler::default();
        let err = scheduler
            .run(&WorkItem::Value(json!(42)))
            .await
            .expect_err("expected error");
        assert_eq!(err, RunError::Malformed(CloneError::NotAGroup { found: "number" }));
        assert_eq!(
            scheduler.diagnostics().count(DiagnosticKind::MalformedRoot),
            1
        );
    }

    #[tokio::test]
    async fn callback_fires_once_even_for_malformed_root() {
        let scheduler = Scheduler::default();
        let mut calls = Vec::new();
        scheduler
            .run_with(&WorkItem::Unit(fail("x")), |result| calls.push(result.is_err()))
            .await;
        scheduler
            .run_with(&WorkTree::new().into(), |result| calls.push(result.is_err()))
            .await;
        assert_eq!(calls, vec![true, false]);
    }
}
