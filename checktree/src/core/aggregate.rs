//! Composite results for one level of the work tree.

use std::collections::HashMap;

use serde::Serialize;

use crate::core::outcome::OutcomeState;
use crate::core::report::Report;

/// Derived result of one group, built from its children's reports.
///
/// `results` keeps completion order. State only grows toward failure: a failed
/// child sets `failed` and clears `succeeded`, a later success never clears a
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    key: String,
    succeeded: bool,
    failed: bool,
    results: Vec<Report>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl Aggregate {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            succeeded: false,
            failed: false,
            results: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Outcome-style view of the derived flags. Empty aggregates are `Unknown`.
    pub fn state(&self) -> OutcomeState {
        match (self.succeeded, self.failed) {
            (_, true) => OutcomeState::Failure,
            (true, false) => OutcomeState::Success,
            (false, false) => OutcomeState::Unknown,
        }
    }

    /// Insert a child report, overwriting an existing child with the same key
    /// in place.
    pub fn add(&mut self, report: Report) {
        if report.failed() {
            self.failed = true;
            self.succeeded = false;
        } else if report.succeeded() && !self.failed {
            self.succeeded = true;
        }

        match self.positions.get(report.key()) {
            Some(&index) => self.results[index] = report,
            None => {
                self.positions
                    .insert(report.key().to_string(), self.results.len());
                self.results.push(report);
            }
        }
    }

    pub fn results(&self) -> &[Report] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Report> {
        self.positions.get(key).map(|&index| &self.results[index])
    }

    /// Look up a nested report by `/`-separated path, e.g. `"b/c"`.
    pub fn find(&self, path: &str) -> Option<&Report> {
        let mut segments = path.split('/');
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            current = match current {
                Report::Aggregate(aggregate) => aggregate.get(segment)?,
                Report::Outcome(_) => return None,
            };
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::Outcome;
    use serde_json::json;

    fn settled(key: &str, signal: Result<serde_json::Value, serde_json::Value>) -> Report {
        let mut outcome = Outcome::new(key);
        outcome.apply(signal);
        Report::Outcome(outcome)
    }

    #[test]
    fn empty_aggregate_is_unknown() {
        let aggregate = Aggregate::new("root");
        assert!(!aggregate.succeeded());
        assert!(!aggregate.failed());
        assert_eq!(aggregate.state(), OutcomeState::Unknown);
        assert!(aggregate.is_empty());
    }

    #[test]
    fn success_child_marks_success() {
        let mut aggregate = Aggregate::new("root");
        aggregate.add(settled("a", Ok(json!("a"))));
        assert!(aggregate.succeeded());
        assert!(!aggregate.failed());
    }

    #[test]
    fn failure_child_clears_success() {
        let mut aggregate = Aggregate::new("root");
        aggregate.add(settled("a", Ok(json!("a"))));
        aggregate.add(settled("b", Err(json!("b"))));
        assert!(aggregate.failed());
        assert!(!aggregate.succeeded());
    }

    #[test]
    fn later_success_does_not_clear_failure() {
        let mut aggregate = Aggregate::new("root");
        aggregate.add(settled("a", Err(json!("a"))));
        aggregate.add(settled("b", Ok(json!("b"))));
        aggregate.add(settled("a", Ok(json!("retry"))));
        assert!(aggregate.failed());
        assert!(!aggregate.succeeded());
    }

    #[test]
    fn unknown_child_leaves_state_unknown() {
        let mut aggregate = Aggregate::new("root");
        aggregate.add(Report::Outcome(Outcome::new("pending")));
        assert_eq!(aggregate.state(), OutcomeState::Unknown);
        assert_eq!(aggregate.len(), 1);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut aggregate = Aggregate::new("root");
        aggregate.add(settled("a", Ok(json!(1))));
        aggregate.add(settled("b", Ok(json!(2))));
        aggregate.add(settled("a", Ok(json!(3))));

        let keys: Vec<&str> = aggregate.results().iter().map(Report::key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        match aggregate.get("a") {
            Some(Report::Outcome(outcome)) => assert_eq!(outcome.message, json!(3)),
            other => panic!("unexpected report: {other:?}"),
        }
    }

    #[test]
    fn invalid_child_fails_aggregate() {
        let mut outcome = Outcome::new("twice");
        outcome.apply(Ok(json!(1)));
        outcome.apply(Ok(json!(2)));
        let mut aggregate = Aggregate::new("root");
        aggregate.add(Report::Outcome(outcome));
        assert!(aggregate.failed());
        assert!(!aggregate.succeeded());
    }

    #[test]
    fn wide_level_keeps_lookups_consistent() {
        let mut aggregate = Aggregate::new("root");
        for index in 0..500 {
            aggregate.add(settled(&format!("k{index}"), Ok(json!(index))));
        }
        aggregate.add(settled("k250", Err(json!("redo"))));

        assert_eq!(aggregate.len(), 500);
        assert_eq!(aggregate.results()[250].key(), "k250");
        assert!(aggregate.get("k250").expect("k250").failed());
        assert!(aggregate.get("k499").expect("k499").succeeded());
        assert!(aggregate.failed());
    }

    #[test]
    fn find_walks_nested_paths() {
        let mut inner = Aggregate::new("b");
        inner.add(settled("c", Ok(json!("c"))));
        let mut root = Aggregate::new("root");
        root.add(settled("a", Ok(json!("a"))));
        root.add(Report::Aggregate(inner));

        assert_eq!(root.find("b/c").map(Report::key), Some("c"));
        assert!(root.find("a/c").is_none());
        assert!(root.find("b/missing").is_none());
    }
}
