use std::net::SocketAddr;

use reqwest::Client;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use sports_server::config::{
    AppConfig, AttendanceConfig, AuthConfig, BootstrapAdmin, CorsConfig, DatabaseConfig,
    ServerConfig,
};
use sports_server::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PASSWORD: &str = "password123";

pub mod routes {
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const LOGOUT: &str = "/api/v1/auth/logout";
    pub const ME: &str = "/api/v1/auth/me";
    pub const USERS: &str = "/api/v1/users";
    pub const COURSES: &str = "/api/v1/courses";
    pub const DISCIPLINES: &str = "/api/v1/disciplines";
    pub const ACTIVITIES: &str = "/api/v1/activities";
    pub const ENROLLMENTS: &str = "/api/v1/enrollments";
    pub const SESSIONS: &str = "/api/v1/attendance/sessions";
    pub const SELECTABLE: &str = "/api/v1/attendance/selectable";
    pub const SELECT: &str = "/api/v1/attendance/select";
    pub const FORM_SESSIONS: &str = "/asistencia/";

    pub fn user(id: i32) -> String {
        format!("/api/v1/users/{id}")
    }

    pub fn user_toggle(id: i32) -> String {
        format!("/api/v1/users/{id}/toggle")
    }

    pub fn course(id: i32) -> String {
        format!("/api/v1/courses/{id}")
    }

    pub fn discipline(id: i32) -> String {
        format!("/api/v1/disciplines/{id}")
    }

    pub fn discipline_students(id: i32) -> String {
        format!("/api/v1/disciplines/{id}/students")
    }

    pub fn activity(id: i32) -> String {
        format!("/api/v1/activities/{id}")
    }

    pub fn enrollment(id: i32) -> String {
        format!("/api/v1/enrollments/{id}")
    }

    pub fn mark(activity_id: i32) -> String {
        format!("/api/v1/attendance/activities/{activity_id}/mark")
    }

    pub fn session(activity_id: i32, date: &str) -> String {
        format!("/api/v1/attendance/activities/{activity_id}/sessions/{date}")
    }

    pub fn session_toggle(activity_id: i32, date: &str) -> String {
        format!("/api/v1/attendance/activities/{activity_id}/sessions/{date}/toggle")
    }

    pub fn form_mark(activity_id: i32) -> String {
        format!("/asistencia/{activity_id}/marcar/")
    }
}

/// A running test server backed by an in-memory SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.expect("Failed to read response body");
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

fn test_config(attendance: AttendanceConfig) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        // One connection that never idles out, so the in-memory database
        // lives as long as the pool.
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout_secs: None,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-for-integration-tests".to_string(),
            token_ttl_hours: 1,
            bootstrap_admin: Some(BootstrapAdmin {
                username: ADMIN_USERNAME.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            }),
        },
        attendance,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(AttendanceConfig::default()).await
    }

    pub async fn spawn_with(attendance: AttendanceConfig) -> Self {
        let config = test_config(attendance);
        let db = sports_server::database::init_db(&config.database)
            .await
            .expect("Failed to initialize test database");
        sports_server::seed::run(&db, &config.auth)
            .await
            .expect("Failed to seed test database");

        let app = sports_server::build_router(AppState {
            db: db.clone(),
            config,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// A client that keeps cookies and follows redirects, like a browser.
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build cookie client")
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);
        res.body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn create_course(&self, token: &str, name: &str) -> i32 {
        let res = self
            .post_with_token(routes::COURSES, &json!({"name": name}), token)
            .await;
        assert_eq!(res.status, 201, "Course creation failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }

    pub async fn create_discipline(&self, token: &str, name: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::DISCIPLINES,
                &json!({"name": name, "description": ""}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "Discipline creation failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }

    /// Register a non-student user and return its profile id.
    pub async fn create_staff(&self, token: &str, username: &str, role: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::USERS,
                &json!({
                    "username": username,
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                    "email": format!("{username}@school.test"),
                    "first_name": "Staff",
                    "last_name": username,
                    "run": format!("RUN-{username}"),
                    "phone": "",
                    "address": "",
                    "role": role,
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "Staff registration failed: {}", res.text);
        res.body["profile"]["id"].as_i64().unwrap() as i32
    }

    /// Register a student and return `(profile_id, student_id)`.
    pub async fn create_student(
        &self,
        token: &str,
        username: &str,
        first_name: &str,
        last_name: &str,
        course_id: i32,
    ) -> (i32, i32) {
        let res = self
            .post_with_token(
                routes::USERS,
                &json!({
                    "username": username,
                    "password": PASSWORD,
                    "password_confirm": PASSWORD,
                    "email": "",
                    "first_name": first_name,
                    "last_name": last_name,
                    "run": format!("RUN-{username}"),
                    "phone": "",
                    "address": "",
                    "role": "student",
                    "course_id": course_id,
                    "admission_date": "2023-03-01",
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "Student registration failed: {}", res.text);
        (
            res.body["profile"]["id"].as_i64().unwrap() as i32,
            res.body["student"]["id"].as_i64().unwrap() as i32,
        )
    }

    pub async fn enroll(&self, token: &str, student_id: i32, discipline_id: i32) -> i32 {
        let res = self
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({"student_id": student_id, "discipline_id": discipline_id}),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "Enrollment failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }

    pub async fn create_activity(&self, token: &str, body: &Value) -> i32 {
        let res = self.post_with_token(routes::ACTIVITIES, body, token).await;
        assert_eq!(res.status, 201, "Activity creation failed: {}", res.text);
        res.body["id"].as_i64().unwrap() as i32
    }
}
