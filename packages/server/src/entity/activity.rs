use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(12))")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Roster comes from active enrollments in the discipline.
    #[sea_orm(string_value = "ordinary")]
    Ordinary,
    /// Roster is the explicit `activity_student` list.
    #[sea_orm(string_value = "tournament")]
    Tournament,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub kind: ActivityKind,

    pub discipline_id: i32,
    #[sea_orm(belongs_to, from = "discipline_id", to = "id")]
    pub discipline: HasOne<super::discipline::Entity>,

    pub start_date: Date,
    pub end_date: Option<Date>,
    pub location: String,
}

impl ActiveModelBehavior for ActiveModel {}
