//! Database entities.

#![allow(missing_docs)]

pub mod artwork;
pub mod client;
pub mod client_column;
pub mod client_tag;
pub mod gallery;
pub mod login_history;
pub mod phone_verification;
pub mod sms_delivery;
pub mod sms_message;
pub mod tag;
pub mod user;

pub use artwork::Entity as Artwork;
pub use client::Entity as Client;
pub use client_column::Entity as ClientColumn;
pub use client_tag::Entity as ClientTag;
pub use gallery::Entity as Gallery;
pub use login_history::Entity as LoginHistory;
pub use phone_verification::Entity as PhoneVerification;
pub use sms_delivery::Entity as SmsDelivery;
pub use sms_message::Entity as SmsMessage;
pub use tag::Entity as Tag;
pub use user::Entity as User;
