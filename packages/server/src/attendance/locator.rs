use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use super::{Actor, AttendanceError};
use crate::config::SessionMode;
use crate::entity::attendance_session;

/// Reject dates outside the activity window.
///
/// `today` is checked first: nothing can be recorded for an activity that
/// has not started, whatever date is requested.
pub fn check_window(
    start: NaiveDate,
    end: Option<NaiveDate>,
    requested: NaiveDate,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    if today < start {
        return Err(AttendanceError::NotStarted { start });
    }
    if requested < start {
        return Err(AttendanceError::BeforeStart { requested, start });
    }
    if let Some(end) = end
        && requested > end
    {
        return Err(AttendanceError::AfterEnd { requested, end });
    }
    Ok(())
}

/// Fields of an existing session the locator may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStamp {
    pub date: NaiveDate,
    pub recorder_id: Option<i32>,
    pub trainer_id: Option<i32>,
}

impl From<&attendance_session::Model> for SessionStamp {
    fn from(m: &attendance_session::Model) -> Self {
        Self {
            date: m.date,
            recorder_id: m.recorder_id,
            trainer_id: m.trainer_id,
        }
    }
}

/// Updates to apply when a save reuses a session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Backfill {
    pub date: Option<NaiveDate>,
    pub recorder_id: Option<i32>,
    pub trainer_id: Option<i32>,
}

impl Backfill {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.recorder_id.is_none() && self.trainer_id.is_none()
    }
}

/// Fill empty attribution fields and move the session to `date`.
/// Attribution already present is never overwritten.
pub fn plan_backfill(current: SessionStamp, date: NaiveDate, actor: &Actor) -> Backfill {
    Backfill {
        date: (current.date != date).then_some(date),
        recorder_id: current.recorder_id.is_none().then_some(actor.profile_id),
        trainer_id: (current.trainer_id.is_none() && actor.is_trainer())
            .then_some(actor.profile_id),
    }
}

/// Session a save for `date` would land on. Read-only.
pub async fn find<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
    date: NaiveDate,
    mode: SessionMode,
) -> Result<Option<attendance_session::Model>, DbErr> {
    let mut query = attendance_session::Entity::find()
        .filter(attendance_session::Column::ActivityId.eq(activity_id));
    if mode == SessionMode::PerDate {
        query = query.filter(attendance_session::Column::Date.eq(date));
    }
    query
        .order_by_asc(attendance_session::Column::Id)
        .one(conn)
        .await
}

/// Session on exactly (activity, date), regardless of mode.
pub async fn find_exact<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
    date: NaiveDate,
) -> Result<attendance_session::Model, AttendanceError> {
    attendance_session::Entity::find()
        .filter(attendance_session::Column::ActivityId.eq(activity_id))
        .filter(attendance_session::Column::Date.eq(date))
        .one(conn)
        .await?
        .ok_or(AttendanceError::SessionNotFound { date })
}

/// Find the session for a save, creating it if needed. Returns the session and
/// whether it was created.
pub async fn locate_or_create<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
    date: NaiveDate,
    mode: SessionMode,
    actor: &Actor,
) -> Result<(attendance_session::Model, bool), DbErr> {
    let now = Utc::now();

    let Some(existing) = find(conn, activity_id, date, mode).await? else {
        let created = attendance_session::ActiveModel {
            activity_id: Set(activity_id),
            date: Set(date),
            recorder_id: Set(Some(actor.profile_id)),
            trainer_id: Set(actor.is_trainer().then_some(actor.profile_id)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        return Ok((created, true));
    };

    let plan = plan_backfill(SessionStamp::from(&existing), date, actor);
    if plan.is_empty() {
        return Ok((existing, false));
    }

    let mut active: attendance_session::ActiveModel = existing.into();
    if let Some(date) = plan.date {
        active.date = Set(date);
    }
    if let Some(id) = plan.recorder_id {
        active.recorder_id = Set(Some(id));
    }
    if let Some(id) = plan.trainer_id {
        active.trainer_id = Set(Some(id));
    }
    active.updated_at = Set(now);
    let updated = active.update(conn).await?;
    Ok((updated, false))
}
