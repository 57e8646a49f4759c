//! Common utilities and shared types for maws.
//!
//! This crate provides foundational components used across all maws crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and gallery registration codes via [`IdGenerator`]
//! - **Tokens**: HS256 access/refresh tokens via [`TokenIssuer`]
//! - **Storage**: File storage backends (local, S3-compatible)
//!
//! # Example
//!
//! ```no_run
//! use maws_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let code = id_gen.generate_registration_code();
//!     println!("{}: {}", config.server.url, code);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod jwt;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use jwt::{Claims, TokenIssuer, TokenKind, TokenPair};
pub use storage::{
    LocalStorage, PresignedUpload, StorageBackend, StorageConfig, UploadedFile,
    artwork_storage_key,
};

#[cfg(feature = "s3")]
pub use storage::S3Storage;
