//! # Curio Common Library
//!
//! Shared code for the Curio services including:
//! - Error types
//! - Event types (CurioEvent enum) and the broadcast event bus
//! - Configuration file resolution
//! - SSE utilities

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
