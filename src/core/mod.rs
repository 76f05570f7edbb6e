//! Core module - shared infrastructure for Parley
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config, ModelSpec, ToolsConfig};
pub use error::{ParleyError, Result};
pub use types::*;
