use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Header for one attendance pass over an activity.
///
/// Unique on (activity_id, date); see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_session")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub activity_id: i32,
    #[sea_orm(belongs_to, from = "activity_id", to = "id")]
    pub activity: HasOne<super::activity::Entity>,

    pub date: Date,

    /// Profile that first saved this session.
    pub recorder_id: Option<i32>,
    /// Supervising trainer profile, set only when a trainer saved it.
    pub trainer_id: Option<i32>,

    pub active: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
