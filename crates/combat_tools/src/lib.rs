//! # Combat Development Tools
//!
//! Command-line tools for development:
//! - Data validators
//! - Offline scene runs for balance checks

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod simulate;
pub mod validate;
