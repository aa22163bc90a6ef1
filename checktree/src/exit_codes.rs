//! Stable exit codes for `checktree` commands.

/// Run completed and nothing failed (or self-test expectations held).
pub const OK: i32 = 0;
/// Invalid input: unreadable manifest or config, or a root that is not a group.
pub const INVALID: i32 = 1;
/// Run completed and the report is failed (or self-test expectations broke).
pub const FAILED: i32 = 2;
