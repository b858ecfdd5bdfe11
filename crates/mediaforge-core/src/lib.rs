//! Core types for the Mediaforge derivative pipeline.
//!
//! This crate holds the domain models (media types, quality tiers, video
//! variants, processing status), the pipeline error taxonomy, and the
//! environment-driven configuration shared by the storage and processing
//! crates. It has no I/O of its own.

pub mod config;
pub mod error;
pub mod models;

pub use config::{ProcessingConfig, StorageConfig};
pub use error::{PipelineError, TimeoutKind};
