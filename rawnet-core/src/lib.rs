//! rawnet Core Library
//!
//! This crate provides the error handling and codec configuration shared by
//! the rawnet packet codecs.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::CodecConfig;
pub use error::{Error, Result};
