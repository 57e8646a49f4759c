//! Core business logic for maws.

pub mod services;

pub use services::*;
