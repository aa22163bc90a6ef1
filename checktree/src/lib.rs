//! Sequential runner for trees of asynchronous checks.
//!
//! A work tree maps keys to executable [`Unit`]s or nested groups. The
//! [`Scheduler`] runs every unit exactly once, in tree order, one at a time,
//! and folds the results into a report tree of
//! [`Outcome`](core::outcome::Outcome)s and
//! [`Aggregate`](core::aggregate::Aggregate)s. The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure result model and tree copying. No I/O, no awaits.
//! - **[`scheduler`]**: The async engine that drives units and builds reports.
//! - **[`io`]**: Config files, manifests, and command units for the binary.
//!
//! ```no_run
//! use checktree::{Completion, Unit, WorkTree};
//!
//! # async fn demo() -> Result<(), checktree::RunError> {
//! let tree = WorkTree::new()
//!     .with("ping", Unit::new(|done: Completion| async move { done.succeed("pong") }))
//!     .with("math", WorkTree::new().with(
//!         "sum",
//!         Unit::new(|done: Completion| async move { done.succeed(2 + 2) }),
//!     ));
//! let report = checktree::run(&tree.into()).await?;
//! assert!(!report.failed());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod diagnostics;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod render;
pub mod scheduler;
pub mod selftest;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod work;

pub use crate::core::aggregate::Aggregate;
pub use crate::core::outcome::{Outcome, OutcomeState, Signal};
pub use crate::core::report::{Report, Summary};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use scheduler::{RunError, Scheduler};
pub use work::{Completion, Unit, WorkItem, WorkTree};

/// Run `tree` with a fresh diagnostics sink.
pub async fn run(tree: &WorkItem) -> Result<Aggregate, RunError> {
    Scheduler::default().run(tree).await
}
