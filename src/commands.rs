//! User-facing commands, implemented as methods on [`crate::App`].
//!
//! - [`prepare`]: set up a preview environment for a pull request

pub mod prepare;
