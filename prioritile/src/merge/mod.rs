//! The concurrent merge phase: turning discovered sources into destination tiles.
//!
//! [`merge_tilesets`] builds the backlog of tile coordinates, feeds one [`Job`] per coordinate
//! through a bounded queue to a pool of workers and returns a [`MergeSummary`].

mod config;
pub use config::*;

mod job;
pub use job::*;

mod outcome;
pub use outcome::*;

mod progress;

mod scheduler;
pub use scheduler::*;

mod worker;
