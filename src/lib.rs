//! Block index for wpkg package archives.
//!
//! An index is a sequence of fixed 1024-byte [`storage::format::Block`]
//! records, one header per installed file plus (for version 1.1) overflow
//! blocks carrying names and links longer than 300 bytes. The
//! [`controlled`] wrappers provide the range-checked and must-initialize
//! values used around it.

pub mod config;
pub mod controlled;
pub mod core;
pub mod storage;
