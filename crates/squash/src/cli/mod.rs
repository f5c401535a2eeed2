//! CLI command implementations.

pub mod compress;
pub mod config;
pub mod inspect;
