use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ADMIN: &str = "admin";
pub const COORDINATOR: &str = "coordinator";
pub const TRAINER: &str = "trainer";
pub const STUDENT: &str = "student";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
}

impl ActiveModelBehavior for ActiveModel {}
