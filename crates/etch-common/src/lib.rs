//! # etch-common
//!
//! Shared types for the etch provisioning tool.
//!
//! This crate provides:
//! - The common error type
//! - Fixed filesystem locations
//! - Octal mode parsing
//! - Duration string parsing

#![warn(missing_docs)]

pub mod duration;
pub mod error;
pub mod mode;
pub mod paths;

pub use duration::parse_duration;
pub use error::{EtchError, EtchResult};
pub use mode::FileMode;
pub use paths::EtchPaths;
