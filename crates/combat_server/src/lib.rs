//! # Combat Battle Server
//!
//! Runs combat scenes on a tokio runtime.
//!
//! - [`manager`] - bounded registry of running scenes, one task per scene
//! - [`runner`] - fixed-interval tick loop with cooperative cancellation
//! - [`protocol`] - JSON combat-start requests and responses
//! - [`config`] - server configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod runner;

pub use config::{SeedPolicy, ServerConfig};
pub use error::{Result, ServerError};
pub use manager::{SceneManager, SceneResult, SceneTicket};
pub use runner::SceneEvent;
