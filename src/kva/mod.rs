//! KVA document serialization.
//!
//! KVA is the analysis sidecar format: a single XML document with the root
//! element `KinoveaVideoAnalysis`, carrying the keyframes and their drawings,
//! the chronometers and the trajectories for one video. Reading is lenient
//! (unknown elements are logged and skipped); writing always emits the
//! current format version.

pub mod error;
pub mod migration;
pub mod registry;
pub mod writer;
pub mod xml;


pub use error::{KvaError, SaveResult};
pub use registry::DrawingRegistry;

/// Format version written to new documents.
pub const FORMAT_VERSION: &str = "2.0";

/// Oldest format version the reader accepts, after migration.
pub const MINIMUM_FORMAT_VERSION: f64 = 1.3;
