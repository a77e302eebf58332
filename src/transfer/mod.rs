// src/transfer/mod.rs

//! Atomic publication of produced files.
//!
//! Every file an operation produces is written to a [`StagedFile`] first and
//! only linked to its final path by a single rename once it is complete.
//! [`ScratchRoot`] guards the cleanup of temporary directories.

pub mod scratch;
pub mod staged;

pub use scratch::ScratchRoot;
pub use staged::{StagedFile, stage_with};
