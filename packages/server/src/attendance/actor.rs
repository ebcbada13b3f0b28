use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use super::AttendanceError;
use crate::entity::{profile, role};
use crate::extractors::auth::AuthUser;

/// The profile a write is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub profile_id: i32,
    pub role: String,
}

impl Actor {
    pub fn is_trainer(&self) -> bool {
        self.role == role::TRAINER
    }

    /// Look the profile up by user rather than trusting the token, which may
    /// predate the profile. Superusers get no exemption.
    pub async fn resolve<C: ConnectionTrait>(
        conn: &C,
        user: &AuthUser,
    ) -> Result<Self, AttendanceError> {
        let profile = profile::Entity::find()
            .filter(profile::Column::UserId.eq(user.user_id))
            .one(conn)
            .await?
            .ok_or(AttendanceError::MissingProfile)?;

        if !profile.active {
            return Err(AttendanceError::InactiveProfile);
        }

        Ok(Actor {
            profile_id: profile.id,
            role: profile.role,
        })
    }
}
