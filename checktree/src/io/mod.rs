//! I/O helpers for the `checktree` binary: config, manifests, child processes.

pub mod config;
pub mod manifest;
pub mod process;
