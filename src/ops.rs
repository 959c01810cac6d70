//! Integration layers for the external tools `prep-waldo` drives.
//!
//! - [`git`]: cloning, branching, committing and pushing through the git CLI
//!
//! Each submodule provides a trait-based abstraction with a real
//! implementation and a mock (under `cfg(test)`) for unit tests.

pub mod git;
