//! Filesystem cache of computed output.
//!
//! This module provides the on-disk store behind `hold`:
//! - Each write adds a `<name>.<timestamp>` file under a root directory
//! - Freshness is decided at read time against a caller-supplied cutoff
//! - `load` serves the newest fresh entry or runs a producer and stores its output
//! - History is never pruned

mod entries;
mod error;
mod name;
mod store;
mod traits;

pub use store::HoldDir;
pub use traits::{CacheSource, Held, Producer, ProducerError};
