//! Build cache retrieval and extraction.
//!
//! `cachepull-core` downloads a build cache archive, tells gzip from plain
//! tar without seeking, checks that the archive was produced on a
//! compatible stack, extracts it and moves its items to their destinations.
//!
//! # Examples
//!
//! ```no_run
//! use cachepull_core::CacheSource;
//! use cachepull_core::RestoreConfig;
//! use cachepull_core::RestoreOutcome;
//! use cachepull_core::restore_cache;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RestoreConfig::default()
//!     .with_cache_source(Some(CacheSource::Api("https://cache.example/api".into())))
//!     .with_current_stack_id(Some("linux-docker-android".into()));
//!
//! match restore_cache(&config)? {
//!     RestoreOutcome::Restored(report) => {
//!         println!("placed {} items", report.placement.placed_count());
//!     }
//!     other => println!("nothing restored: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod io;
pub mod manifest;
pub mod placement;
pub mod report;
pub mod stack;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

// Re-export main API types
pub use api::restore_cache;
pub use api::restore_cache_with;
pub use config::CacheSource;
pub use config::RestoreConfig;
pub use download::HttpClient;
pub use download::HttpResponse;
pub use download::ReqwestClient;
pub use error::RestoreError;
pub use error::Result;
pub use extraction::ExtractStrategy;
pub use manifest::CacheItem;
pub use manifest::CacheManifest;
pub use report::DownloadProgress;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::RestoreOutcome;
pub use report::RestoreReport;
pub use stack::GateDecision;
