//! CLI command implementations.
//!
//! - [`config`] - Configuration file management (path, show, init)
//! - [`simulate`] - Drive the prefetch queue through a navigation script

pub mod config;
pub mod fetcher;
pub mod simulate;
