use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder,
    SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::config::AuthConfig;
use crate::entity::{
    attendance_detail, attendance_session, enrollment, role, role_permission, user,
};
use crate::permissions::{DEFAULT_MAPPINGS, DEFAULT_ROLES};
use crate::utils::hash::hash_password;

/// Everything the server needs in the database before it accepts requests.
pub async fn run(db: &DatabaseConnection, auth: &AuthConfig) -> Result<(), DbErr> {
    seed_role_permissions(db).await?;
    ensure_indexes(db).await?;
    ensure_bootstrap_admin(db, auth).await
}

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

fn index_sql(db: &DatabaseConnection, stmt: &IndexCreateStatement) -> String {
    match db.get_database_backend() {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        _ => stmt.to_string(MysqlQueryBuilder),
    }
}

/// Ensure the composite unique indexes exist.
///
/// Schema sync only handles single-column uniqueness, so the pairs are
/// created here. Failures abort startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let indexes = [
        Index::create()
            .if_not_exists()
            .unique()
            .name("uq_enrollment_student_discipline")
            .table(enrollment::Entity)
            .col(enrollment::Column::StudentId)
            .col(enrollment::Column::DisciplineId)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .unique()
            .name("uq_attendance_session_activity_date")
            .table(attendance_session::Entity)
            .col(attendance_session::Column::ActivityId)
            .col(attendance_session::Column::Date)
            .to_owned(),
        Index::create()
            .if_not_exists()
            .unique()
            .name("uq_attendance_detail_session_participant")
            .table(attendance_detail::Entity)
            .col(attendance_detail::Column::SessionId)
            .col(attendance_detail::Column::ParticipantId)
            .to_owned(),
    ];

    for stmt in &indexes {
        db.execute_unprepared(&index_sql(db, stmt)).await?;
    }
    info!("Ensured {} composite unique indexes exist", indexes.len());

    Ok(())
}

/// Create the configured superuser if no account with that name exists yet.
pub async fn ensure_bootstrap_admin(
    db: &DatabaseConnection,
    auth: &AuthConfig,
) -> Result<(), DbErr> {
    let Some(admin) = &auth.bootstrap_admin else {
        return Ok(());
    };

    let exists = user::Entity::find()
        .filter(user::Column::Username.eq(&admin.username))
        .count(db)
        .await?
        > 0;
    if exists {
        return Ok(());
    }

    let password = hash_password(&admin.password)
        .map_err(|e| DbErr::Custom(format!("failed to hash bootstrap password: {e}")))?;
    user::ActiveModel {
        username: Set(admin.username.clone()),
        password: Set(password),
        email: Set(String::new()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        is_superuser: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(username = %admin.username, "Created bootstrap superuser");
    Ok(())
}
