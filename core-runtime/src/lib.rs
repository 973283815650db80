//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the tone cache:
//! - Logging and tracing infrastructure
//! - Event bus system
//! - Shared runtime errors
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other crates depend on. It
//! establishes the logging conventions and event broadcasting mechanisms used
//! throughout the workspace.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
