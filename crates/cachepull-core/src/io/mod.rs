//! I/O utilities for cache retrieval.
//!
//! This module provides the rewindable reader used by format detection and
//! the streaming copy used when saving downloads.

pub mod copy;
pub mod restore;

pub use copy::copy_with_progress;
pub use restore::RestorableReader;
