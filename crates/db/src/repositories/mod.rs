//! Database repositories.

#![allow(missing_docs)]

pub mod artwork;
pub mod client;
pub mod client_column;
pub mod gallery;
pub mod phone_verification;
pub mod sms;
pub mod tag;
pub mod user;

pub use artwork::{ArtworkFilter, ArtworkRepository, ArtworkSort};
pub use client::ClientRepository;
pub use client_column::ClientColumnRepository;
pub use gallery::{GalleryRepository, GalleryStats};
pub use phone_verification::PhoneVerificationRepository;
pub use sms::SmsRepository;
pub use tag::TagRepository;
pub use user::{LoginStats, UserRepository, UserStats};
