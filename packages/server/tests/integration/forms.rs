use serde_json::{Value, json};

use crate::common::{PASSWORD, TestApp, routes};

struct Setup {
    app: TestApp,
    activity: i32,
    p1: i32,
    p2: i32,
}

async fn setup() -> Setup {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let course = app.create_course(&admin, "8A").await;
    let discipline = app.create_discipline(&admin, "Volleyball").await;
    let (p1, s1) = app
        .create_student(&admin, "ana", "Ana", "Pérez", course)
        .await;
    let (p2, s2) = app
        .create_student(&admin, "beto", "Beto", "Soto", course)
        .await;
    app.enroll(&admin, s1, discipline).await;
    app.enroll(&admin, s2, discipline).await;
    app.create_staff(&admin, "coach", "trainer").await;
    let activity = app
        .create_activity(
            &admin,
            &json!({
                "name": "Volleyball Training",
                "kind": "ordinary",
                "discipline_id": discipline,
                "start_date": "2024-03-01",
                "location": "Gym",
            }),
        )
        .await;
    Setup {
        app,
        activity,
        p1,
        p2,
    }
}

async fn logged_in_browser(app: &TestApp) -> reqwest::Client {
    let browser = app.browser();
    let res = browser
        .post(app.url(routes::LOGIN))
        .json(&json!({"username": "coach", "password": PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    browser
}

async fn submit(
    app: &TestApp,
    browser: &reqwest::Client,
    activity: i32,
    fields: &[(&str, String)],
) -> (String, Value) {
    let res = browser
        .post(app.url(&routes::form_mark(activity)))
        .form(fields)
        .send()
        .await
        .unwrap();
    let landed = res.url().path().to_string();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    (landed, body)
}

#[tokio::test]
async fn successful_submission_redirects_with_a_success_flash() {
    let s = setup().await;
    let browser = logged_in_browser(&s.app).await;

    let (landed, body) = submit(
        &s.app,
        &browser,
        s.activity,
        &[
            ("fecha", "2024-03-05".to_string()),
            ("presentes", s.p1.to_string()),
            ("presentes", s.p2.to_string()),
        ],
    )
    .await;

    assert_eq!(landed, routes::FORM_SESSIONS);
    assert_eq!(body["flash"]["level"], "success");
    assert_eq!(
        body["flash"]["message"],
        "Attendance for 05-03-2024 saved. Presentes: 2."
    );
    assert_eq!(body["data"][0]["present_count"], 2);

    // Shown once.
    let again: Value = browser
        .get(s.app.url(routes::FORM_SESSIONS))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(again["flash"].is_null());
}

#[tokio::test]
async fn submission_takes_the_date_from_the_query_string() {
    let s = setup().await;
    let browser = logged_in_browser(&s.app).await;

    let res = browser
        .post(s.app.url(&format!(
            "{}?fecha=2024-03-05",
            routes::form_mark(s.activity)
        )))
        .form(&[("presentes", s.p1.to_string())])
        .send()
        .await
        .unwrap();

    assert_eq!(res.url().path(), routes::FORM_SESSIONS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["flash"]["message"],
        "Attendance for 05-03-2024 saved. Presentes: 1."
    );
    assert_eq!(body["data"][0]["date"], "2024-03-05");
}

#[tokio::test]
async fn out_of_window_date_redirects_with_an_error_flash() {
    let s = setup().await;
    let browser = logged_in_browser(&s.app).await;

    let (landed, body) = submit(
        &s.app,
        &browser,
        s.activity,
        &[
            ("fecha", "2024-02-20".to_string()),
            ("presentes", s.p1.to_string()),
        ],
    )
    .await;

    assert_eq!(landed, routes::FORM_SESSIONS);
    assert_eq!(body["flash"]["level"], "error");
    assert_eq!(
        body["flash"]["message"],
        "The date 20-02-2024 is before the activity start (01-03-2024)"
    );
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn submission_without_checkboxes_records_nobody() {
    let s = setup().await;
    let browser = logged_in_browser(&s.app).await;

    let (_, body) = submit(
        &s.app,
        &browser,
        s.activity,
        &[("fecha", "2024-03-05".to_string())],
    )
    .await;

    assert_eq!(body["flash"]["level"], "success");
    assert_eq!(body["data"][0]["present_count"], 0);
}

#[tokio::test]
async fn form_marking_view_accepts_fecha() {
    let s = setup().await;
    let browser = logged_in_browser(&s.app).await;

    let res = browser
        .get(s.app.url(&format!(
            "{}?fecha=2024-03-05",
            routes::form_mark(s.activity)
        )))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["date"], "2024-03-05");
    assert_eq!(body["roster"].as_array().unwrap().len(), 2);
}
