//! Private working copy of a work tree.
//!
//! The scheduler consumes a [`WorkingCopy`] instead of the caller's tree. Keys
//! are snapshotted once; each key owns a slot that moves
//! `Pending -> Running -> Done`, so an entry can be taken and completed at most
//! once regardless of how often a unit signals.

use serde_json::Value;
use thiserror::Error;

use crate::work::{Unit, WorkItem, WorkTree};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloneError {
    #[error("work tree root must be a group, found {found}")]
    NotAGroup { found: &'static str },
}

/// Copied entry. Units are shared, groups are deep copies.
#[derive(Debug)]
pub enum Entry {
    Unit(Unit),
    Group(WorkingCopy),
    Invalid(Value),
}

#[derive(Debug)]
enum Slot {
    Pending(Entry),
    Running,
    Done,
}

/// Handle to a taken entry, used to complete it without a key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

#[derive(Debug, Default)]
pub struct WorkingCopy {
    keys: Vec<String>,
    slots: Vec<Slot>,
    cursor: usize,
    done: usize,
}

impl WorkingCopy {
    fn from_tree(tree: &WorkTree) -> Self {
        let mut copy = Self::default();
        for (key, item) in tree.iter() {
            let entry = match item {
                WorkItem::Unit(unit) => Entry::Unit(unit.clone()),
                WorkItem::Group(group) => Entry::Group(Self::from_tree(group)),
                WorkItem::Value(Value::Object(map)) => {
                    Entry::Group(Self::from_tree(&WorkTree::from(map.clone())))
                }
                WorkItem::Value(_) if item.is_empty_slot() => continue,
                WorkItem::Value(value) => Entry::Invalid(value.clone()),
            };
            copy.keys.push(key.to_string());
            copy.slots.push(Slot::Pending(entry));
        }
        copy
    }

    /// Take the first pending entry and mark it running.
    pub fn take_next(&mut self) -> Option<(SlotId, String, Entry)> {
        while self.cursor < self.slots.len() {
            let index = self.cursor;
            self.cursor += 1;
            match std::mem::replace(&mut self.slots[index], Slot::Running) {
                Slot::Pending(entry) => {
                    return Some((SlotId(index), self.keys[index].clone(), entry));
                }
                other => self.slots[index] = other,
            }
        }
        None
    }

    /// Mark a running entry done. Returns `false` if it is not running.
    pub fn complete(&mut self, slot: SlotId) -> bool {
        match self.slots.get(slot.0) {
            Some(Slot::Running) => {
                self.slots[slot.0] = Slot::Done;
                self.done += 1;
                true
            }
            Some(Slot::Pending(_) | Slot::Done) | None => false,
        }
    }

    /// Entries not yet completed.
    pub fn remaining(&self) -> usize {
        self.slots.len() - self.done
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Validate the root and copy it.
pub fn clone_tree(root: &WorkItem) -> Result<WorkingCopy, CloneError> {
    match root {
        WorkItem::Group(tree) => Ok(WorkingCopy::from_tree(tree)),
        WorkItem::Value(Value::Object(map)) => {
            Ok(WorkingCopy::from_tree(&WorkTree::from(map.clone())))
        }
        other => Err(CloneError::NotAGroup { found: other.kind() }),
    }
}
