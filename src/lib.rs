//! Repocache - Repodata Cache-Coherency Engine
//!
//! Decides per (channel, platform) subdir whether a cached package index
//! is still usable, refreshes it with conditional HTTP requests when it
//! is not, and atomically commits the result together with its
//! cache-validation metadata.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;

pub use error::{Error, Result};
