//! emberdb common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all emberdb components.

pub mod config;
pub mod error;
pub mod page;
pub mod types;

pub use config::{IndexConfig, StorageConfig, VmConfig};
pub use error::{EmberError, Result};
pub use page::{PageId, PAGE_SIZE};
pub use types::{Key, KeyKind, Value};
