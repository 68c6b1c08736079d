//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`export`] - Export a tile package to a zoom/column/row tree
//! - [`inspect`] - Show package metadata and its LOD/zoom ladder

pub mod common;
pub mod export;
pub mod inspect;
