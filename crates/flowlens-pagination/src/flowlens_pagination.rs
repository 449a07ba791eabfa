//! Flowlens Pagination - hybrid cursor/offset pagination
//!
//! This crate provides the pagination abstraction used by list endpoints:
//! - Opaque, round-trippable cursor tokens over a sort position
//! - Offset pagination with concurrent count + fetch
//! - Cursor (keyset) pagination that never pays for a count
//! - A hybrid mode accepting either a page number or a cursor

pub mod cursor;
pub mod paginator;

pub use cursor::*;
pub use paginator::*;
