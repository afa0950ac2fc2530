//! # bridge_core - Staged Construction Engine for Girder Bridges
//!
//! `bridge_core` follows a precast or spliced post-tensioned girder line
//! through its construction timeline. Every quantity (section properties,
//! material maturity, prestress losses, internal forces, specification
//! checks) is evaluated per interval between timeline events, at canonical
//! points of interest along the girder.
//!
//! ## Design Philosophy
//!
//! - **Interval-based**: the timeline drives what exists and how mature it is
//! - **JSON-First**: projects, settings and check artifacts serialize with serde
//! - **Rich Errors**: structured, exhaustive error types, never bare strings
//! - **Raw SI values**: N, m, Pa and days in, the same out; presentation is the caller's job
//!
//! ## Quick Start
//!
//! ```rust
//! use bridge_core::pipeline::{BridgeAnalysis, NullProgress};
//! use bridge_core::project::Project;
//!
//! let mut analysis = BridgeAnalysis::new(Project::single_span_example());
//! let output = analysis.run(&NullProgress, None).unwrap();
//! for failure in output.artifacts.failures() {
//!     println!("{:?} {}: {} > {}", failure.kind, failure.label, failure.demand, failure.capacity);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`project`] - Project container, metadata and example girders
//! - [`bridge`] - Girder line geometry, prestressing and reinforcement
//! - [`timeline`] - Construction events, activities and intervals
//! - [`poi`] - Point-of-interest registry
//! - [`sections`] - Section properties and material state per interval
//! - [`losses`] - Lump-sum and time-step prestress losses
//! - [`analysis`] - Line-girder analysis, live load and load combinations
//! - [`artifacts`] - Specification checks
//! - [`pipeline`] - The full analysis pass, progress and cancellation
//! - [`file_io`] - `.pgx` files with atomic saves and locking

pub mod analysis;
pub mod artifacts;
pub mod bridge;
pub mod errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_io;
pub mod losses;
pub mod materials;
pub mod overrides;
pub mod pipeline;
pub mod poi;
pub mod project;
pub mod provisions;
pub mod sections;
pub mod settings;
pub mod timeline;
pub mod units;

pub use errors::{BridgeError, BridgeResult};
#[cfg(not(target_arch = "wasm32"))]
pub use file_io::{load_project, save_project, FileLock};
pub use pipeline::{BridgeAnalysis, CancellationToken, ProgressSink};
pub use project::{Project, ProjectMetadata};
