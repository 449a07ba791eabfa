//! Flowlens Analyzer - query plan inspection and index advisories
//!
//! This crate provides functionality for:
//! - Normalizing EXPLAIN plan trees into flat node sequences
//! - Heuristic analysis of queries and plans into suggestions and
//!   index recommendations
//! - Frequency tracking of normalized query fingerprints

pub mod advisor;
pub mod explain;
pub mod frequency;

pub use advisor::*;
pub use explain::*;
pub use frequency::*;
