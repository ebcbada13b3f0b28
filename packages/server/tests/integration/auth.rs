use serde_json::json;

use crate::common::{ADMIN_PASSWORD, ADMIN_USERNAME, PASSWORD, TestApp, routes};

mod login {
    use super::*;

    #[tokio::test]
    async fn bootstrap_admin_can_log_in() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["superuser"], true);
        assert!(res.body["role"].is_null());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": ADMIN_USERNAME, "password": "not-the-password"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_user_is_rejected_like_a_wrong_password() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "ghost", "password": "whatever1"}),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn trainer_token_carries_role_permissions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_staff(&admin, "coach", "trainer").await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "coach", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["role"], "trainer");
        let permissions: Vec<&str> = res.body["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p.as_str())
            .collect();
        assert!(permissions.contains(&"attendance:mark"));
        assert!(!permissions.contains(&"user:manage"));
    }

    #[tokio::test]
    async fn disabled_profile_cannot_log_in() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_staff(&admin, "coach", "trainer").await;
        let users = app
            .get_with_token(&format!("{}?q=coach", routes::USERS), &admin)
            .await;
        let user_id = users.body["data"][0]["id"].as_i64().unwrap() as i32;
        let toggled = app
            .post_with_token(&routes::user_toggle(user_id), &json!({}), &admin)
            .await;
        assert_eq!(toggled.status, 200, "{}", toggled.text);

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({"username": "coach", "password": PASSWORD}),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ACCOUNT_DISABLED");
    }
}

mod identity {
    use super::*;

    #[tokio::test]
    async fn me_requires_a_token() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "not.a.jwt").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn me_reports_the_profile() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let profile_id = app.create_staff(&admin, "coach", "trainer").await;
        let token = app.login("coach", PASSWORD).await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["username"], "coach");
        assert_eq!(res.body["profile_id"], profile_id);
        assert_eq!(res.body["role"], "trainer");
    }

    #[tokio::test]
    async fn token_stops_working_once_the_profile_is_disabled() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_staff(&admin, "coach", "trainer").await;
        let token = app.login("coach", PASSWORD).await;
        let users = app
            .get_with_token(&format!("{}?q=coach", routes::USERS), &admin)
            .await;
        let user_id = users.body["data"][0]["id"].as_i64().unwrap() as i32;
        app.post_with_token(&routes::user_toggle(user_id), &json!({}), &admin)
            .await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "ACCOUNT_DISABLED");
    }

    #[tokio::test]
    async fn cookie_session_authenticates_and_logout_ends_it() {
        let app = TestApp::spawn().await;
        let browser = app.browser();

        let login = browser
            .post(app.url(routes::LOGIN))
            .json(&json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}))
            .send()
            .await
            .unwrap();
        assert_eq!(login.status(), 200);

        let me = browser.get(app.url(routes::ME)).send().await.unwrap();
        assert_eq!(me.status(), 200);

        let logout = browser.post(app.url(routes::LOGOUT)).send().await.unwrap();
        assert_eq!(logout.status(), 200);

        let me = browser.get(app.url(routes::ME)).send().await.unwrap();
        assert_eq!(me.status(), 401);
    }
}
