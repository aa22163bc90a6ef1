//! Report tree: leaf outcomes and group aggregates.

use serde::Serialize;

use crate::core::aggregate::Aggregate;
use crate::core::outcome::{Outcome, OutcomeState};

/// A node of the finished report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Outcome(Outcome),
    Aggregate(Aggregate),
}

impl Report {
    pub fn key(&self) -> &str {
        match self {
            Self::Outcome(outcome) => &outcome.key,
            Self::Aggregate(aggregate) => aggregate.key(),
        }
    }

    pub fn succeeded(&self) -> bool {
        match self {
            Self::Outcome(outcome) => outcome.succeeded(),
            Self::Aggregate(aggregate) => aggregate.succeeded(),
        }
    }

    pub fn failed(&self) -> bool {
        match self {
            Self::Outcome(outcome) => outcome.failed(),
            Self::Aggregate(aggregate) => aggregate.failed(),
        }
    }

    pub fn state(&self) -> OutcomeState {
        match self {
            Self::Outcome(outcome) => outcome.state,
            Self::Aggregate(aggregate) => aggregate.state(),
        }
    }

    pub fn as_outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Outcome(outcome) => Some(outcome),
            Self::Aggregate(_) => None,
        }
    }

    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            Self::Aggregate(aggregate) => Some(aggregate),
            Self::Outcome(_) => None,
        }
    }
}

impl From<Outcome> for Report {
    fn from(outcome: Outcome) -> Self {
        Self::Outcome(outcome)
    }
}

impl From<Aggregate> for Report {
    fn from(aggregate: Aggregate) -> Self {
        Self::Aggregate(aggregate)
    }
}

/// Leaf counts by state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
    pub unknown: usize,
}

impl Summary {
    pub fn of(report: &Report) -> Self {
        let mut summary = Self::default();
        summary.count(report);
        summary
    }

    pub fn of_aggregate(aggregate: &Aggregate) -> Self {
        let mut summary = Self::default();
        for child in aggregate.results() {
            summary.count(child);
        }
        summary
    }

    fn count(&mut self, report: &Report) {
        match report {
            Report::Outcome(outcome) => {
                self.total += 1;
                match outcome.state {
                    OutcomeState::Success => self.succeeded += 1,
                    OutcomeState::Failure => self.failed += 1,
                    OutcomeState::Invalid => self.invalid += 1,
                    OutcomeState::Unknown => self.unknown += 1,
                }
            }
            Report::Aggregate(aggregate) => {
                for child in aggregate.results() {
                    self.count(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_counts_nested_leaves() {
        let mut ok = Outcome::new("ok");
        ok.apply(Ok(json!(1)));
        let mut bad = Outcome::new("bad");
        bad.apply(Err(json!("no")));
        let mut twice = Outcome::new("twice");
        twice.apply(Ok(json!(1)));
        twice.apply(Ok(json!(1)));

        let mut inner = Aggregate::new("inner");
        inner.add(bad.into());
        inner.add(twice.into());
        let mut root = Aggregate::new("root");
        root.add(ok.into());
        root.add(inner.into());

        let summary = Summary::of(&Report::Aggregate(root));
        assert_eq!(
            summary,
            Summary {
                total: 3,
                succeeded: 1,
                failed: 1,
                invalid: 1,
                unknown: 0,
            }
        );
    }

    #[test]
    fn report_serializes_with_kind_tag() {
        let mut outcome = Outcome::new("a");
        outcome.apply(Ok(json!("a")));
        let mut root = Aggregate::new("success");
        root.add(outcome.into());

        let value = serde_json::to_value(Report::Aggregate(root)).expect("serialize");
        assert_eq!(value["kind"], json!("aggregate"));
        assert_eq!(value["key"], json!("success"));
        assert_eq!(value["succeeded"], json!(true));
        assert_eq!(value["results"][0]["kind"], json!("outcome"));
        assert_eq!(value["results"][0]["state"], json!("success"));
        assert_eq!(value["results"][0]["message"], json!("a"));
    }
}
