use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::activity::ActivityKind;
use crate::entity::enrollment::EnrollmentStatus;
use crate::entity::{activity, activity_student, enrollment, profile, student, user};
use crate::models::attendance::RosterEntry;

/// Expected participants of an activity, ordered by (last name, first name).
///
/// Ordinary activities take every student actively enrolled in the discipline;
/// tournaments take their explicit list. Students with a disabled profile are
/// left out either way.
pub async fn resolve<C: ConnectionTrait>(
    conn: &C,
    activity: &activity::Model,
) -> Result<Vec<RosterEntry>, DbErr> {
    let student_ids: Vec<i32> = match activity.kind {
        ActivityKind::Ordinary => {
            enrollment::Entity::find()
                .select_only()
                .column(enrollment::Column::StudentId)
                .filter(enrollment::Column::DisciplineId.eq(activity.discipline_id))
                .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
                .into_tuple()
                .all(conn)
                .await?
        }
        ActivityKind::Tournament => {
            activity_student::Entity::find()
                .select_only()
                .column(activity_student::Column::StudentId)
                .filter(activity_student::Column::ActivityId.eq(activity.id))
                .into_tuple()
                .all(conn)
                .await?
        }
    };

    load_students(conn, &student_ids, true).await
}

/// Build sorted roster entries for the given student IDs.
pub async fn load_students<C: ConnectionTrait>(
    conn: &C,
    student_ids: &[i32],
    only_active: bool,
) -> Result<Vec<RosterEntry>, DbErr> {
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }

    let students = student::Entity::find()
        .filter(student::Column::Id.is_in(student_ids.to_vec()))
        .all(conn)
        .await?;

    let profile_ids: Vec<i32> = students.iter().map(|s| s.profile_id).collect();
    let mut profiles_query =
        profile::Entity::find().filter(profile::Column::Id.is_in(profile_ids));
    if only_active {
        profiles_query = profiles_query.filter(profile::Column::Active.eq(true));
    }
    let profiles: HashMap<i32, profile::Model> = profiles_query
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let user_ids: Vec<i32> = profiles.values().map(|p| p.user_id).collect();
    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let mut entries: Vec<RosterEntry> = students
        .iter()
        .filter_map(|s| {
            let p = profiles.get(&s.profile_id)?;
            let u = users.get(&p.user_id)?;
            Some(RosterEntry {
                profile_id: p.id,
                student_id: s.id,
                username: u.username.clone(),
                first_name: u.first_name.clone(),
                last_name: u.last_name.clone(),
            })
        })
        .collect();

    sort_entries(&mut entries);
    Ok(entries)
}

/// Case-insensitive (last name, first name), then profile ID for a stable order.
pub fn sort_entries(entries: &mut [RosterEntry]) {
    entries.sort_by_cached_key(|e| {
        (
            e.last_name.to_lowercase(),
            e.first_name.to_lowercase(),
            e.profile_id,
        )
    });
}
