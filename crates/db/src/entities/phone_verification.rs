//! Phone verification code entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A one-time code sent to a phone number during signup.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phone_verification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Domestic digits, e.g. `01012345678`.
    #[sea_orm(indexed)]
    pub phone_number: String,

    /// Six digits.
    #[serde(skip_serializing)]
    pub code: String,

    pub created_at: DateTimeWithTimeZone,

    pub expires_at: DateTimeWithTimeZone,

    #[sea_orm(default_value = false)]
    pub verified: bool,

    #[sea_orm(nullable)]
    pub verified_at: Option<DateTimeWithTimeZone>,

    /// Number of code checks so far.
    #[sea_orm(default_value = 0)]
    pub attempts: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
