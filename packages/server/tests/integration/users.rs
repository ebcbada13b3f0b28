use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

#[tokio::test]
async fn student_registration_creates_profile_and_student() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let course = app.create_course(&admin, "8A").await;

    let (profile_id, student_id) = app
        .create_student(&admin, "ana", "Ana", "Pérez", course)
        .await;

    let users = app
        .get_with_token(&format!("{}?q=ana", routes::USERS), &admin)
        .await;
    assert_eq!(users.status, 200, "{}", users.text);
    let user = &users.body["data"][0];
    assert_eq!(user["profile"]["id"], profile_id);
    assert_eq!(user["profile"]["role"], "student");
    assert_eq!(user["student"]["id"], student_id);
    assert_eq!(user["student"]["course_id"], course);
}

#[tokio::test]
async fn student_without_course_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({
                "username": "ana",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
                "email": "",
                "first_name": "Ana",
                "last_name": "Pérez",
                "run": "11111111-1",
                "phone": "",
                "address": "",
                "role": "student",
            }),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "coach", "trainer").await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({
                "username": "coach",
                "password": PASSWORD,
                "password_confirm": PASSWORD,
                "email": "",
                "first_name": "Other",
                "last_name": "Coach",
                "run": "22222222-2",
                "phone": "",
                "address": "",
                "role": "trainer",
            }),
            &admin,
        )
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.body["code"], "USERNAME_TAKEN");
}

#[tokio::test]
async fn mismatched_password_confirmation_is_rejected() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let res = app
        .post_with_token(
            routes::USERS,
            &json!({
                "username": "coach",
                "password": PASSWORD,
                "password_confirm": "different-one",
                "email": "",
                "first_name": "Staff",
                "last_name": "Coach",
                "run": "33333333-3",
                "phone": "",
                "address": "",
                "role": "trainer",
            }),
            &admin,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn trainers_cannot_manage_users() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "coach", "trainer").await;
    let token = app.login("coach", PASSWORD).await;

    let res = app.get_with_token(routes::USERS, &token).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn update_changes_profile_fields() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "coach", "trainer").await;
    let users = app
        .get_with_token(&format!("{}?q=coach", routes::USERS), &admin)
        .await;
    let user_id = users.body["data"][0]["id"].as_i64().unwrap() as i32;

    let res = app
        .patch_with_token(
            &routes::user(user_id),
            &json!({"phone": "+56 9 1234 5678", "role": "coordinator"}),
            &admin,
        )
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["profile"]["phone"], "+56 9 1234 5678");
    assert_eq!(res.body["profile"]["role"], "coordinator");
}

#[tokio::test]
async fn toggle_flips_the_active_flag_both_ways() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "coach", "trainer").await;
    let users = app
        .get_with_token(&format!("{}?q=coach", routes::USERS), &admin)
        .await;
    let user_id = users.body["data"][0]["id"].as_i64().unwrap() as i32;

    let off = app
        .post_with_token(&routes::user_toggle(user_id), &json!({}), &admin)
        .await;
    assert_eq!(off.body["user"]["profile"]["active"], false);
    assert_eq!(off.body["message"], "User «Staff coach» was disabled.");

    let on = app
        .post_with_token(&routes::user_toggle(user_id), &json!({}), &admin)
        .await;
    assert_eq!(on.body["user"]["profile"]["active"], true);
    assert_eq!(on.body["message"], "User «Staff coach» was enabled.");
}

#[tokio::test]
async fn search_matches_inactive_keyword() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_staff(&admin, "coach", "trainer").await;
    app.create_staff(&admin, "helper", "trainer").await;
    let users = app
        .get_with_token(&format!("{}?q=helper", routes::USERS), &admin)
        .await;
    let helper_id = users.body["data"][0]["id"].as_i64().unwrap() as i32;
    app.post_with_token(&routes::user_toggle(helper_id), &json!({}), &admin)
        .await;

    let res = app
        .get_with_token(&format!("{}?q=inactivo", routes::USERS), &admin)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let names: Vec<&str> = res.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|u| u["username"].as_str())
        .collect();
    assert_eq!(names, vec!["helper"]);
}
