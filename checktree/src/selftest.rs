//! Built-in self-test: a fixed work tree with a known expected report.
//!
//! `checktree self-test` runs [`self_test_tree`] through the real scheduler and
//! checks the result with [`verify`]. The tree covers nested failure
//! propagation, a double-signalling unit, a skipped empty slot, and an invalid
//! value.

use serde_json::{Value, json};

use crate::core::aggregate::Aggregate;
use crate::core::outcome::{DUPLICATED_CALL, INVALID_VALUE, OutcomeState};
use crate::core::report::Report;
use crate::scheduler::FAILURE_KEY;
use crate::work::{Completion, Unit, WorkTree};

fn ok(value: &'static str) -> Unit {
    Unit::new(move |completion: Completion| async move { completion.succeed(value) })
}

fn err(error: &'static str) -> Unit {
    Unit::new(move |completion: Completion| async move { completion.fail(error) })
}

fn twice() -> Unit {
    Unit::new(|completion: Completion| async move {
        completion.succeed("first");
        completion.succeed("second");
    })
}

pub fn self_test_tree() -> WorkTree {
    WorkTree::new()
        .with("a", ok("a"))
        .with("b", WorkTree::new().with("e", err("e")).with("c", ok("c")))
        .with("twice", twice())
        .with("skipped", Value::Null)
        .with("bogus", json!("not a unit"))
}

struct Expected {
    path: &'static str,
    state: OutcomeState,
    message: &'static str,
}

const EXPECTED_LEAVES: &[Expected] = &[
    Expected {
        path: "a",
        state: OutcomeState::Success,
        message: "a",
    },
    Expected {
        path: "b/e",
        state: OutcomeState::Failure,
        message: "e",
    },
    Expected {
        path: "b/c",
        state: OutcomeState::Success,
        message: "c",
    },
    Expected {
        path: "twice",
        state: OutcomeState::Invalid,
        message: DUPLICATED_CALL,
    },
    Expected {
        path: "bogus",
        state: OutcomeState::Failure,
        message: INVALID_VALUE,
    },
];

/// Compare a report of [`self_test_tree`] against the expected shape.
///
/// Returns one message per mismatch; empty means the engine behaved.
pub fn verify(report: &Aggregate) -> Vec<String> {
    let mut errors = Vec::new();

    if report.key() != FAILURE_KEY {
        errors.push(format!(
            "root key: expected '{FAILURE_KEY}', got '{}'",
            report.key()
        ));
    }
    if !report.failed() || report.succeeded() {
        errors.push("root: expected failed and not succeeded".to_string());
    }

    let order: Vec<&str> = report.results().iter().map(Report::key).collect();
    if order != ["a", "b", "twice", "bogus"] {
        errors.push(format!("root order: got {order:?}"));
    }
    if report.get("skipped").is_some() {
        errors.push("skipped: empty slot should not be reported".to_string());
    }

    match report.get("b") {
        Some(Report::Aggregate(group)) => {
            if !group.failed() {
                errors.push("b: expected failed group".to_string());
            }
            let order: Vec<&str> = group.results().iter().map(Report::key).collect();
            if order != ["e", "c"] {
                errors.push(format!("b order: got {order:?}"));
            }
        }
        _ => errors.push("b: expected a group report".to_string()),
    }

    for expected in EXPECTED_LEAVES {
        match report.find(expected.path).and_then(Report::as_outcome) {
            Some(outcome) => {
                if outcome.state != expected.state {
                    errors.push(format!(
                        "{}: expected {:?}, got {:?}",
                        expected.path, expected.state, outcome.state
                    ));
                }
                if outcome.message != json!(expected.message) {
                    errors.push(format!(
                        "{}: expected message {:?}, got {}",
                        expected.path, expected.message, outcome.message
                    ));
                }
            }
            None => errors.push(format!("{}: missing outcome", expected.path)),
        }
    }

    errors
}
