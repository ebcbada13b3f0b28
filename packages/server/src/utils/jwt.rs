use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    /// Profile ID, absent for accounts without a profile.
    pub pid: Option<i32>,
    pub role: Option<String>,
    pub superuser: bool,
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration timestamp
}

/// Identity fields baked into a token.
pub struct TokenSubject<'a> {
    pub user_id: i32,
    pub username: &'a str,
    pub profile_id: Option<i32>,
    pub role: Option<&'a str>,
    pub superuser: bool,
    pub permissions: Vec<String>,
}

/// Sign a new JWT token for a user.
pub fn sign(subject: TokenSubject<'_>, secret: &str, ttl_hours: i64) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| anyhow::anyhow!("token expiry overflows"))?
        .timestamp();

    let claims = Claims {
        sub: subject.username.to_owned(),
        uid: subject.user_id,
        pid: subject.profile_id,
        role: subject.role.map(str::to_owned),
        superuser: subject.superuser,
        permissions: subject.permissions,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
