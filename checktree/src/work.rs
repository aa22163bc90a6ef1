//! Work tree input model: units, groups, and the completion handle.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::core::outcome::Signal;
use crate::diagnostics::{DiagnosticKind, Diagnostics};

type UnitFn = dyn Fn(Completion) -> BoxFuture<'static, ()> + Send + Sync;

/// An executable unit: an async function of one [`Completion`] handle.
///
/// Units are shared by reference. Cloning a `Unit` (or a tree holding one)
/// never duplicates the function, and equality is pointer identity.
#[derive(Clone)]
pub struct Unit(Arc<UnitFn>);

impl Unit {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move |completion: Completion| -> BoxFuture<'static, ()> {
            Box::pin(f(completion))
        }))
    }

    pub(crate) fn start(&self, completion: Completion) -> BoxFuture<'static, ()> {
        (self.0)(completion)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// One value in a work tree.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    Unit(Unit),
    Group(WorkTree),
    /// Anything else. Falsy values are skipped, the rest fail as invalid.
    Value(Value),
}

impl WorkItem {
    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit(_) => "unit",
            Self::Group(_) => "group",
            Self::Value(value) => value_kind(value),
        }
    }

    /// Falsy entries (`null`, `false`, `0`, `""`) are treated as empty slots.
    pub fn is_empty_slot(&self) -> bool {
        match self {
            Self::Value(value) => is_falsy(value),
            Self::Unit(_) | Self::Group(_) => false,
        }
    }
}

impl From<Unit> for WorkItem {
    fn from(unit: Unit) -> Self {
        Self::Unit(unit)
    }
}

impl From<WorkTree> for WorkItem {
    fn from(tree: WorkTree) -> Self {
        Self::Group(tree)
    }
}

/// JSON objects are groups; every other value stays a plain value.
impl From<Value> for WorkItem {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Group(map.into()),
            other => Self::Value(other),
        }
    }
}

/// Ordered mapping from key to work item. Order is execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkTree {
    entries: Vec<(String, WorkItem)>,
}

impl WorkTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`WorkTree::insert`].
    pub fn with(mut self, key: impl Into<String>, item: impl Into<WorkItem>) -> Self {
        self.insert(key, item);
        self
    }

    /// Insert an entry. An existing key is overwritten in place.
    pub fn insert(&mut self, key: impl Into<String>, item: impl Into<WorkItem>) {
        let key = key.into();
        let item = item.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = item,
            None => self.entries.push((key, item)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&WorkItem> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, item)| item)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkItem)> {
        self.entries.iter().map(|(key, item)| (key.as_str(), item))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for WorkTree {
    fn from(map: Map<String, Value>) -> Self {
        let mut tree = Self::new();
        for (key, value) in map {
            tree.insert(key, value);
        }
        tree
    }
}

/// Handle a unit uses to report completion.
///
/// A unit should signal exactly once. Extra signals are not errors at the call
/// site; the scheduler records them on the unit's outcome and in the run's
/// diagnostics.
#[derive(Debug, Clone)]
pub struct Completion {
    key: Arc<str>,
    tx: mpsc::UnboundedSender<Signal>,
    diagnostics: Diagnostics,
}

impl Completion {
    pub(crate) fn new(
        key: &str,
        tx: mpsc::UnboundedSender<Signal>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            key: Arc::from(key),
            tx,
            diagnostics,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn signal(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            self.diagnostics.record(
                DiagnosticKind::LateSignal,
                &self.key,
                "signal arrived after the outcome was recorded",
            );
        }
    }

    /// Callback-shaped signal: an error wins over the value.
    pub fn done(&self, error: Option<Value>, value: Value) {
        match error {
            Some(error) => self.signal(Err(error)),
            None => self.signal(Ok(value)),
        }
    }

    pub fn succeed(&self, value: impl Into<Value>) {
        self.signal(Ok(value.into()));
    }

    pub fn fail(&self, error: impl Into<Value>) {
        self.signal(Err(error.into()));
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
