//! Leaf results and the completion-signal state machine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message stored when a unit signals success a second time.
pub const DUPLICATED_CALL: &str = "duplicated call: completion was signalled more than once";

/// Message stored for a tree entry that is neither a unit nor a group.
pub const INVALID_VALUE: &str = "invalid value: expected an executable unit or a group";

/// Message stored when every completion handle is dropped without a signal.
pub const COMPLETION_DROPPED: &str = "completion dropped: unit finished without signalling";

/// Completion signal carried by a unit: `Ok(value)` or `Err(error)`.
pub type Signal = Result<Value, Value>;

/// Settlement state of a single unit.
///
/// `Invalid` means both succeeded and failed; it is only reachable when a unit
/// breaks the single-signal contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeState {
    Unknown,
    Success,
    Failure,
    Invalid,
}

impl OutcomeState {
    pub fn succeeded(self) -> bool {
        matches!(self, Self::Success | Self::Invalid)
    }

    pub fn failed(self) -> bool {
        matches!(self, Self::Failure | Self::Invalid)
    }
}

/// What a signal did to an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First signal: the outcome moved out of `Unknown`.
    Settled,
    /// Signal arrived after a success; the outcome is now `Invalid`.
    Violation,
    /// Outcome had already failed; the signal was dropped.
    Ignored,
}

/// Recorded result of one executable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub key: String,
    pub state: OutcomeState,
    pub message: Value,
}

impl Outcome {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: OutcomeState::Unknown,
            message: Value::Null,
        }
    }

    /// Failure outcome for an entry whose value cannot be executed.
    pub fn invalid_value(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: OutcomeState::Failure,
            message: Value::String(INVALID_VALUE.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state.succeeded()
    }

    pub fn failed(&self) -> bool {
        self.state.failed()
    }

    pub fn is_settled(&self) -> bool {
        self.state != OutcomeState::Unknown
    }

    /// Apply a completion signal.
    ///
    /// First failure wins. A first success can only be overridden by a second
    /// signal, which marks the outcome `Invalid`.
    pub fn apply(&mut self, signal: Signal) -> Transition {
        match (self.state, signal) {
            (OutcomeState::Failure | OutcomeState::Invalid, _) => Transition::Ignored,
            (OutcomeState::Unknown, Err(error)) => {
                self.state = OutcomeState::Failure;
                self.message = error;
                Transition::Settled
            }
            (OutcomeState::Unknown, Ok(value)) => {
                self.state = OutcomeState::Success;
                self.message = value;
                Transition::Settled
            }
            (OutcomeState::Success, Ok(_)) => {
                self.state = OutcomeState::Invalid;
                self.message = Value::String(DUPLICATED_CALL.to_string());
                Transition::Violation
            }
            (OutcomeState::Success, Err(error)) => {
                self.state = OutcomeState::Invalid;
                self.message = error;
                Transition::Violation
            }
        }
    }
}
