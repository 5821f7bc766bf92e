//! Validated path types.
//!
//! Archive entries and manifest items name paths relative to an extraction
//! root. These types guarantee at construction that such a path stays
//! inside whatever root it is joined to.

pub mod safe_path;

pub use safe_path::SafePath;
