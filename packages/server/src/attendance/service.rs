use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sea_orm::sea_query::Query as SeaQuery;
use sea_orm::*;
use tracing::info;

use super::{Actor, AttendanceError, locator, reconciler, roster};
use crate::config::{AttendanceConfig, SessionMode};
use crate::entity::{activity, attendance_detail, attendance_session, discipline, profile, user};
use crate::extractors::auth::AuthUser;
use crate::models::attendance::{
    ActivitySummary, MarkAttendanceResponse, MarkingRow, MarkingView, PresentParticipant,
    RosterEntry, SessionDetailResponse, SessionListItem,
};
use crate::models::shared::{display_date, page_offset};
use crate::utils::search::ilike_any;

/// Shown when a save finds nobody to mark.
pub const EMPTY_ROSTER_MESSAGE: &str = "No students are enrolled for this activity.";

/// Result of a save request.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved {
        session: attendance_session::Model,
        present_count: u64,
        created: bool,
    },
    /// The roster was empty; nothing was written.
    NothingToSave { date: NaiveDate },
}

impl SaveOutcome {
    pub fn message(&self) -> String {
        match self {
            SaveOutcome::Saved {
                session,
                present_count,
                ..
            } => format!(
                "Attendance for {} saved. Presentes: {}.",
                display_date(session.date),
                present_count
            ),
            SaveOutcome::NothingToSave { .. } => EMPTY_ROSTER_MESSAGE.into(),
        }
    }
}

impl From<SaveOutcome> for MarkAttendanceResponse {
    fn from(outcome: SaveOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            SaveOutcome::Saved {
                session,
                present_count,
                ..
            } => Self {
                saved: true,
                session_id: Some(session.id),
                date: session.date,
                present_count,
                message,
            },
            SaveOutcome::NothingToSave { date } => Self {
                saved: false,
                session_id: None,
                date,
                present_count: 0,
                message,
            },
        }
    }
}

/// Filters for the session list; dates already parsed.
#[derive(Debug, Default)]
pub struct SessionFilter {
    pub discipline_id: Option<i32>,
    pub activity_id: Option<i32>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Lowercased, escaped LIKE pattern.
    pub participant: Option<String>,
}

/// Calendar date of `now` at the given offset. Out-of-range offsets fall back to UTC.
pub fn local_date(now: DateTime<Utc>, offset_minutes: i32) -> NaiveDate {
    match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
        Some(offset) => now.with_timezone(&offset).date_naive(),
        None => now.date_naive(),
    }
}

fn summary(activity: &activity::Model, discipline: &discipline::Model) -> ActivitySummary {
    ActivitySummary {
        id: activity.id,
        name: activity.name.clone(),
        kind: activity.kind,
        discipline_id: discipline.id,
        discipline_name: discipline.name.clone(),
        start_date: activity.start_date,
        end_date: activity.end_date,
    }
}

async fn load_activity<C: ConnectionTrait>(
    conn: &C,
    activity_id: i32,
) -> Result<(activity::Model, discipline::Model), AttendanceError> {
    let activity = activity::Entity::find_by_id(activity_id)
        .one(conn)
        .await?
        .ok_or(AttendanceError::ActivityNotFound)?;
    let discipline = discipline::Entity::find_by_id(activity.discipline_id)
        .one(conn)
        .await?
        .ok_or(AttendanceError::ActivityNotFound)?;
    Ok((activity, discipline))
}

/// Users keyed by the profile ID that owns them.
async fn users_by_profile<C: ConnectionTrait>(
    conn: &C,
    profile_ids: Vec<i32>,
) -> Result<HashMap<i32, user::Model>, DbErr> {
    if profile_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let profiles = profile::Entity::find()
        .filter(profile::Column::Id.is_in(profile_ids))
        .all(conn)
        .await?;
    let mut users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(profiles.iter().map(|p| p.user_id).collect::<Vec<_>>()))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    Ok(profiles
        .into_iter()
        .filter_map(|p| users.remove(&p.user_id).map(|u| (p.id, u)))
        .collect())
}

pub struct AttendanceService<'a> {
    db: &'a DatabaseConnection,
    settings: &'a AttendanceConfig,
}

impl<'a> AttendanceService<'a> {
    pub fn new(db: &'a DatabaseConnection, settings: &'a AttendanceConfig) -> Self {
        Self { db, settings }
    }

    /// Today in the configured offset.
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.settings.utc_offset_minutes)
    }

    /// Expected roster with current presence. Read-only: never creates a session.
    pub async fn marking_view(
        &self,
        activity_id: i32,
        date: Option<NaiveDate>,
    ) -> Result<MarkingView, AttendanceError> {
        let (activity, discipline) = load_activity(self.db, activity_id).await?;
        let today = self.today();
        let date = date.unwrap_or(today);
        locator::check_window(activity.start_date, activity.end_date, date, today)?;

        let expected = roster::resolve(self.db, &activity).await?;
        let session =
            locator::find(self.db, activity.id, date, self.settings.session_mode).await?;

        let present: HashSet<i32> = match &session {
            Some(s) => attendance_detail::Entity::find()
                .select_only()
                .column(attendance_detail::Column::ParticipantId)
                .filter(attendance_detail::Column::SessionId.eq(s.id))
                .into_tuple::<i32>()
                .all(self.db)
                .await?
                .into_iter()
                .collect(),
            None => HashSet::new(),
        };

        let rows: Vec<MarkingRow> = expected
            .into_iter()
            .map(|participant| MarkingRow {
                present: present.contains(&participant.profile_id),
                participant,
            })
            .collect();

        Ok(MarkingView {
            activity: summary(&activity, &discipline),
            date: session.as_ref().map(|s| s.date).unwrap_or(date),
            session_id: session.map(|s| s.id),
            present_count: rows.iter().filter(|r| r.present).count(),
            roster: rows,
        })
    }

    /// Locate or create the session and replace its details, atomically.
    ///
    /// Validation and actor resolution happen before anything is written.
    pub async fn save(
        &self,
        activity_id: i32,
        date: Option<NaiveDate>,
        submitted: &[i32],
        user: &AuthUser,
    ) -> Result<SaveOutcome, AttendanceError> {
        let (activity, _) = load_activity(self.db, activity_id).await?;
        let today = self.today();
        let date = date.unwrap_or(today);
        locator::check_window(activity.start_date, activity.end_date, date, today)?;
        let actor = Actor::resolve(self.db, user).await?;

        let txn = self.db.begin().await?;

        let expected = roster::resolve(&txn, &activity).await?;
        if expected.is_empty() {
            txn.rollback().await?;
            info!(activity_id, "Attendance save skipped: empty roster");
            return Ok(SaveOutcome::NothingToSave { date });
        }

        let (session, created) = locator::locate_or_create(
            &txn,
            activity.id,
            date,
            self.settings.session_mode,
            &actor,
        )
        .await?;
        let present_count =
            reconciler::replace_details(&txn, &session, &expected, submitted, actor.profile_id)
                .await?;

        txn.commit().await?;

        info!(
            activity_id,
            session_id = session.id,
            present_count,
            created,
            actor = actor.profile_id,
            "Attendance saved"
        );

        Ok(SaveOutcome::Saved {
            session,
            present_count,
            created,
        })
    }

    /// Presents and absents of the session on (activity, date).
    pub async fn session_detail(
        &self,
        activity_id: i32,
        date: NaiveDate,
    ) -> Result<SessionDetailResponse, AttendanceError> {
        let (activity, discipline) = load_activity(self.db, activity_id).await?;
        let session = locator::find_exact(self.db, activity.id, date).await?;

        let details = attendance_detail::Entity::find()
            .filter(attendance_detail::Column::SessionId.eq(session.id))
            .all(self.db)
            .await?;
        let users =
            users_by_profile(self.db, details.iter().map(|d| d.participant_id).collect()).await?;

        let mut present: Vec<PresentParticipant> = details
            .iter()
            .filter_map(|d| {
                let u = users.get(&d.participant_id)?;
                Some(PresentParticipant {
                    profile_id: d.participant_id,
                    username: u.username.clone(),
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                    marked_at: d.marked_at,
                })
            })
            .collect();
        present.sort_by_cached_key(|p| {
            (
                p.last_name.to_lowercase(),
                p.first_name.to_lowercase(),
                p.profile_id,
            )
        });

        let present_ids: HashSet<i32> = present.iter().map(|p| p.profile_id).collect();
        let absent: Vec<RosterEntry> = roster::resolve(self.db, &activity)
            .await?
            .into_iter()
            .filter(|e| !present_ids.contains(&e.profile_id))
            .collect();

        Ok(SessionDetailResponse {
            activity: summary(&activity, &discipline),
            session: session.into(),
            present_count: present.len(),
            present,
            absent_count: absent.len(),
            absent,
        })
    }

    /// Flip the session's active flag. Details are left alone.
    pub async fn toggle(
        &self,
        activity_id: i32,
        date: NaiveDate,
    ) -> Result<attendance_session::Model, AttendanceError> {
        let session = locator::find_exact(self.db, activity_id, date).await?;
        let active = !session.active;

        let mut model: attendance_session::ActiveModel = session.into();
        model.active = Set(active);
        model.updated_at = Set(Utc::now());
        let updated = model.update(self.db).await?;

        info!(activity_id, session_id = updated.id, active, "Attendance session toggled");
        Ok(updated)
    }

    /// One page of sessions, newest first, plus the total match count.
    pub async fn list(
        &self,
        filter: &SessionFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<SessionListItem>, u64), DbErr> {
        let mut select = attendance_session::Entity::find();

        if let Some(id) = filter.activity_id {
            select = select.filter(attendance_session::Column::ActivityId.eq(id));
        }
        if let Some(id) = filter.discipline_id {
            select = select.filter(
                attendance_session::Column::ActivityId.in_subquery(
                    SeaQuery::select()
                        .column(activity::Column::Id)
                        .from(activity::Entity)
                        .and_where(activity::Column::DisciplineId.eq(id))
                        .to_owned(),
                ),
            );
        }
        if let Some(from) = filter.from {
            select = select.filter(attendance_session::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            select = select.filter(attendance_session::Column::Date.lte(to));
        }
        if let Some(pattern) = &filter.participant {
            select = select.filter(
                attendance_session::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(attendance_detail::Column::SessionId)
                        .from(attendance_detail::Entity)
                        .and_where(
                            attendance_detail::Column::ParticipantId.in_subquery(
                                SeaQuery::select()
                                    .column(profile::Column::Id)
                                    .from(profile::Entity)
                                    .and_where(
                                        profile::Column::UserId.in_subquery(
                                            SeaQuery::select()
                                                .column(user::Column::Id)
                                                .from(user::Entity)
                                                .cond_where(ilike_any(
                                                    [
                                                        user::Column::FirstName,
                                                        user::Column::LastName,
                                                        user::Column::Username,
                                                    ],
                                                    pattern,
                                                ))
                                                .to_owned(),
                                        ),
                                    )
                                    .to_owned(),
                            ),
                        )
                        .to_owned(),
                ),
            );
        }

        let total = select.clone().paginate(self.db, per_page).num_items().await?;

        let sessions = select
            .order_by_desc(attendance_session::Column::Date)
            .order_by_desc(attendance_session::Column::Id)
            .offset(Some(page_offset(page, per_page)))
            .limit(Some(per_page))
            .all(self.db)
            .await?;
        if sessions.is_empty() {
            return Ok((Vec::new(), total));
        }

        let activities: HashMap<i32, activity::Model> = activity::Entity::find()
            .filter(
                activity::Column::Id.is_in(sessions.iter().map(|s| s.activity_id).collect::<Vec<_>>()),
            )
            .all(self.db)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        let disciplines: HashMap<i32, String> = discipline::Entity::find()
            .filter(
                discipline::Column::Id
                    .is_in(activities.values().map(|a| a.discipline_id).collect::<Vec<_>>()),
            )
            .all(self.db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        let mut counts: HashMap<i32, u64> = HashMap::new();
        let marked: Vec<i32> = attendance_detail::Entity::find()
            .select_only()
            .column(attendance_detail::Column::SessionId)
            .filter(
                attendance_detail::Column::SessionId
                    .is_in(sessions.iter().map(|s| s.id).collect::<Vec<_>>()),
            )
            .into_tuple()
            .all(self.db)
            .await?;
        for session_id in marked {
            *counts.entry(session_id).or_default() += 1;
        }

        let recorders =
            users_by_profile(self.db, sessions.iter().filter_map(|s| s.recorder_id).collect())
                .await?;

        let items = sessions
            .into_iter()
            .filter_map(|s| {
                let activity = activities.get(&s.activity_id)?;
                Some(SessionListItem {
                    id: s.id,
                    activity_id: activity.id,
                    activity_name: activity.name.clone(),
                    discipline_id: activity.discipline_id,
                    discipline_name: disciplines
                        .get(&activity.discipline_id)
                        .cloned()
                        .unwrap_or_default(),
                    date: s.date,
                    recorder_username: s
                        .recorder_id
                        .and_then(|id| recorders.get(&id))
                        .map(|u| u.username.clone()),
                    active: s.active,
                    present_count: counts.get(&s.id).copied().unwrap_or(0),
                })
            })
            .collect();

        Ok((items, total))
    }

    /// Activities that can be opened for marking, newest start first.
    pub async fn selectable(
        &self,
        discipline_id: Option<i32>,
    ) -> Result<Vec<activity::Model>, DbErr> {
        let mut select = activity::Entity::find();
        if let Some(id) = discipline_id {
            select = select.filter(activity::Column::DisciplineId.eq(id));
        }
        if self.settings.session_mode == SessionMode::PerActivity {
            select = select.filter(
                activity::Column::Id.not_in_subquery(
                    SeaQuery::select()
                        .column(attendance_session::Column::ActivityId)
                        .from(attendance_session::Entity)
                        .to_owned(),
                ),
            );
        }
        select
            .order_by_desc(activity::Column::StartDate)
            .order_by_desc(activity::Column::Id)
            .all(self.db)
            .await
    }

    /// Check a discipline/activity pick before sending the user to the marking view.
    pub async fn select(
        &self,
        discipline_id: Option<i32>,
        activity_id: Option<i32>,
    ) -> Result<activity::Model, AttendanceError> {
        let (Some(discipline_id), Some(activity_id)) = (discipline_id, activity_id) else {
            return Err(AttendanceError::Invalid(
                "Choose both a discipline and an activity",
            ));
        };

        let (activity, _) = load_activity(self.db, activity_id).await?;
        if activity.discipline_id != discipline_id {
            return Err(AttendanceError::Invalid(
                "The selected activity does not belong to that discipline",
            ));
        }

        if self.settings.session_mode == SessionMode::PerActivity {
            let existing = attendance_session::Entity::find()
                .filter(attendance_session::Column::ActivityId.eq(activity.id))
                .count(self.db)
                .await?;
            if existing > 0 {
                return Err(AttendanceError::AlreadyRecorded);
            }
        }

        Ok(activity)
    }
}
