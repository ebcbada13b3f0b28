use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Login identity. Domain data (role, RUN, active flag) lives on the profile.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Passes every permission check, with or without a profile.
    pub is_superuser: bool,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// "First Last", or the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
