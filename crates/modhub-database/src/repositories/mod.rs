//! SQL-backed store implementations.

pub mod module;
pub mod setting;
