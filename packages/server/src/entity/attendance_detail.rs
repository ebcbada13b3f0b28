use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One present participant within a session.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_detail")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub session_id: i32,
    #[sea_orm(belongs_to, from = "session_id", to = "id")]
    pub session: HasOne<super::attendance_session::Entity>,

    pub participant_id: i32,
    #[sea_orm(belongs_to, from = "participant_id", to = "id")]
    pub participant: HasOne<super::profile::Entity>,

    pub activity_id: i32,
    #[sea_orm(belongs_to, from = "activity_id", to = "id")]
    pub activity: HasOne<super::activity::Entity>,

    pub marked_at: DateTimeUtc,
    pub marked_by: Option<i32>,
    pub trainer_id: Option<i32>,
}

impl ActiveModelBehavior for ActiveModel {}
