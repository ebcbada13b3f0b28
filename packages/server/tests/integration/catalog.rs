use serde_json::json;

use crate::common::{PASSWORD, TestApp, routes};

mod courses {
    use super::*;

    #[tokio::test]
    async fn duplicate_course_name_conflicts() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_course(&admin, "8A").await;

        let res = app
            .post_with_token(routes::COURSES, &json!({"name": "8A"}), &admin)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn course_with_students_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        app.create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;

        let res = app.delete_with_token(&routes::course(course), &admin).await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn empty_course_is_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;

        let res = app.delete_with_token(&routes::course(course), &admin).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let list = app.get_with_token(routes::COURSES, &admin).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }
}

mod disciplines {
    use super::*;

    #[tokio::test]
    async fn create_then_list_with_search() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        app.create_discipline(&admin, "Volleyball").await;
        app.create_discipline(&admin, "Football").await;

        let res = app
            .get_with_token(&format!("{}?q=volley", routes::DISCIPLINES), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Volleyball");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::DISCIPLINES,
                &json!({"name": "   ", "description": ""}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn rename_updates_the_discipline() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_discipline(&admin, "Volley").await;

        let res = app
            .patch_with_token(
                &routes::discipline(id),
                &json!({"name": "Volleyball"}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Volleyball");
    }

    #[tokio::test]
    async fn discipline_with_enrollments_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (_, student) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        app.enroll(&admin, student, discipline).await;

        let res = app
            .delete_with_token(&routes::discipline(discipline), &admin)
            .await;

        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn students_listing_shows_only_active_enrollments() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (ana, ana_student) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        let (_, beto_student) = app
            .create_student(&admin, "beto", "Beto", "Soto", course)
            .await;
        app.enroll(&admin, ana_student, discipline).await;
        let beto_enrollment = app.enroll(&admin, beto_student, discipline).await;
        app.patch_with_token(
            &routes::enrollment(beto_enrollment),
            &json!({"status": "suspended"}),
            &admin,
        )
        .await;

        let res = app
            .get_with_token(&routes::discipline_students(discipline), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let students = res.body["students"].as_array().unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0]["profile_id"], ana);
    }
}

mod enrollments {
    use super::*;

    #[tokio::test]
    async fn student_cannot_be_enrolled_twice_in_a_discipline() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (_, student) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        app.enroll(&admin, student, discipline).await;

        let res = app
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({"student_id": student, "discipline_id": discipline}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn unknown_student_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;

        let res = app
            .post_with_token(
                routes::ENROLLMENTS,
                &json!({"student_id": 999, "discipline_id": discipline}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (_, ana) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        let (_, beto) = app
            .create_student(&admin, "beto", "Beto", "Soto", course)
            .await;
        app.enroll(&admin, ana, discipline).await;
        let withdrawn = app.enroll(&admin, beto, discipline).await;
        app.patch_with_token(
            &routes::enrollment(withdrawn),
            &json!({"status": "withdrawn"}),
            &admin,
        )
        .await;

        let res = app
            .get_with_token(
                &format!("{}?status=withdrawn", routes::ENROLLMENTS),
                &admin,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], withdrawn);
        assert_eq!(res.body["data"][0]["student_username"], "beto");
    }
}

mod activities {
    use super::*;

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;

        let res = app
            .post_with_token(
                routes::ACTIVITIES,
                &json!({
                    "name": "Training",
                    "kind": "ordinary",
                    "discipline_id": discipline,
                    "start_date": "2024-03-10",
                    "end_date": "2024-03-01",
                    "location": "Gym",
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn tournament_roster_requires_active_enrollment() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (_, stranger) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;

        let res = app
            .post_with_token(
                routes::ACTIVITIES,
                &json!({
                    "name": "Cup",
                    "kind": "tournament",
                    "discipline_id": discipline,
                    "start_date": "2024-03-01",
                    "location": "Stadium",
                    "student_ids": [stranger],
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn tournament_roster_is_returned_and_replaced() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        let discipline = app.create_discipline(&admin, "Volleyball").await;
        let (_, ana) = app
            .create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        let (_, beto) = app
            .create_student(&admin, "beto", "Beto", "Soto", course)
            .await;
        app.enroll(&admin, ana, discipline).await;
        app.enroll(&admin, beto, discipline).await;
        let id = app
            .create_activity(
                &admin,
                &json!({
                    "name": "Cup",
                    "kind": "tournament",
                    "discipline_id": discipline,
                    "start_date": "2024-03-01",
                    "location": "Stadium",
                    "student_ids": [ana],
                }),
            )
            .await;

        let res = app
            .patch_with_token(&routes::activity(id), &json!({"student_ids": [beto]}), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["student_ids"], json!([beto]));
        let fetched = app.get_with_token(&routes::activity(id), &admin).await;
        assert_eq!(fetched.body["student_ids"], json!([beto]));
    }

    #[tokio::test]
    async fn list_searches_the_discipline_name() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let volley = app.create_discipline(&admin, "Volleyball").await;
        let football = app.create_discipline(&admin, "Football").await;
        for (name, discipline) in [("Morning", volley), ("Evening", football)] {
            app.create_activity(
                &admin,
                &json!({
                    "name": name,
                    "kind": "ordinary",
                    "discipline_id": discipline,
                    "start_date": "2024-03-01",
                    "location": "Gym",
                }),
            )
            .await;
        }

        let res = app
            .get_with_token(&format!("{}?q=volley", routes::ACTIVITIES), &admin)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["name"], "Morning");
    }

    #[tokio::test]
    async fn students_cannot_manage_activities() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let course = app.create_course(&admin, "8A").await;
        app.create_student(&admin, "ana", "Ana", "Pérez", course)
            .await;
        let token = app.login("ana", PASSWORD).await;

        let res = app.get_with_token(routes::ACTIVITIES, &token).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}
