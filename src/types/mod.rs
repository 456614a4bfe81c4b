//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod period;
pub mod report;
pub mod sheet;

pub use period::*;
pub use report::*;
pub use sheet::*;
