//! `tsh`, a small interactive shell whose `mv` and `cp` commands move or copy whole
//! directory trees, optionally with one task per subdirectory.
//!
//! ```text
//! tsh> cp -rt /data/src /data/dst
//! Threaded Recursion
//! Copy execution time: 12 milliseconds
//! Successfully copied /data/src to /data/dst
//! ```
//!
//! The transfer engine itself lives in the `common` crate.

pub mod commands;
pub mod repl;

pub use repl::Shell;
