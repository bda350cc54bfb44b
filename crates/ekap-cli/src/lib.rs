//! The `ekap` command-line front end.
//!
//! Everything that touches the outside world lives here: reading and atomically writing files,
//! password input, recent-file history and JSON input/output. The library crates stay pure.

mod cli;
mod fs;
pub mod history;

pub use crate::cli::{run, run_with_args, Args};
pub use crate::fs::atomic_write_bytes;
