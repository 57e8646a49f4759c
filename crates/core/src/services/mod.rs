//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod admin_stats;
pub mod artwork;
pub mod auth;
pub mod client;
pub mod client_column;
pub mod column_mapper;
pub mod excel_import;
pub mod permission;
pub mod sms;
pub mod tag;

pub use account::{
    AccountService, ChangePasswordInput, Dashboard, GalleryInfo, LoginHistoryEntry,
    PermissionCheck, UpdateGalleryInput, UpdateMemberInput, UpdateProfileInput, UserProfile,
};
pub use admin_stats::{AdminStatsService, DataSafetyValidator, StatType};
pub use artwork::{ArtworkInput, ArtworkService, ImageUpload};
pub use auth::{
    AuthService, LoginInput, LoginResponse, PhoneCodeSent, PhoneCodeVerified, PhoneVerifier,
    QuickSignupInput, RegisterInput, RegistrationCodeInfo, SendPhoneCodeInput, UserSummary,
    VerifyPhoneCodeInput,
};
pub use client::{ClientService, ClientView, NewClient, UpdateClient};
pub use client_column::{ClientColumnService, CreateColumnInput, SyncColumn, UpdateColumnInput};
pub use excel_import::{ExcelImportService, MappingImportReport, SimpleImportReport};
pub use permission::Capability;
pub use sms::{
    BulkSendResult, HistoryEntry, MessageDetail, SendSmsInput, SmsGateway, SmsService,
    TwilioGateway,
};
pub use tag::{CreateTagInput, TagService, UpdateTagInput};
