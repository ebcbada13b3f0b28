use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::entity::{attendance_detail, attendance_session};
use crate::models::attendance::RosterEntry;

/// Roster entries whose profile ID was submitted. Unknown IDs are dropped and
/// duplicates collapse.
pub fn select_present<'a>(roster: &'a [RosterEntry], submitted: &[i32]) -> Vec<&'a RosterEntry> {
    let submitted: HashSet<i32> = submitted.iter().copied().collect();
    roster
        .iter()
        .filter(|e| submitted.contains(&e.profile_id))
        .collect()
}

/// Replace the session's detail rows with one row per present participant.
/// Must run inside the caller's transaction.
pub async fn replace_details<C: ConnectionTrait>(
    conn: &C,
    session: &attendance_session::Model,
    roster: &[RosterEntry],
    submitted: &[i32],
    marked_by: i32,
) -> Result<u64, DbErr> {
    attendance_detail::Entity::delete_many()
        .filter(attendance_detail::Column::SessionId.eq(session.id))
        .exec(conn)
        .await?;

    let now = Utc::now();
    let rows: Vec<attendance_detail::ActiveModel> = select_present(roster, submitted)
        .into_iter()
        .map(|e| attendance_detail::ActiveModel {
            session_id: Set(session.id),
            participant_id: Set(e.profile_id),
            activity_id: Set(session.activity_id),
            marked_at: Set(now),
            marked_by: Set(Some(marked_by)),
            trainer_id: Set(session.trainer_id),
            ..Default::default()
        })
        .collect();

    let count = rows.len() as u64;
    if count > 0 {
        attendance_detail::Entity::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }
    Ok(count)
}
