use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds before an idle pooled connection is closed. `None` keeps it open.
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Superuser created on startup when no user with that name exists.
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// How attendance sessions are keyed.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One session per (activity, date).
    #[default]
    PerDate,
    /// One session per activity; saving with another date moves it.
    PerActivity,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AttendanceConfig {
    pub session_mode: SessionMode,
    /// Offset from UTC used to compute "today" (e.g. -180 for UTC-3).
    pub utc_offset_minutes: i32,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            session_mode: SessionMode::PerDate,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub attendance: AttendanceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.token_ttl_hours", 24 * 7)?
            .set_default("attendance.session_mode", "per_date")?
            .set_default("attendance.utc_offset_minutes", 0)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., SPORTS__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("SPORTS").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
