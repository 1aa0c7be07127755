mod helpers;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    use api::auth::generate_jwt;
    use db::models::{
        attendance_session::Model as SessionModel,
        module::Model as ModuleModel,
        user::Model as UserModel,
        user_module_role::{Model as UserModuleRoleModel, Role},
    };

    use crate::helpers::app::make_test_app;

    struct TestCtx {
        lecturer: UserModel,
        student: UserModel,
        module: ModuleModel,
    }

    async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
        let module = ModuleModel::create(db, "ATT201", 2026, Some("Attendance sessions"), 8)
            .await
            .expect("create module");

        let lecturer = UserModel::create(
            db,
            "sess_lect",
            "sess_lect@test.com",
            "Sessions Lecturer",
            "password1",
            false,
        )
        .await
        .unwrap();
        let student = UserModel::create(
            db,
            "sess_student",
            "sess_student@test.com",
            "Sessions Student",
            "password1",
            false,
        )
        .await
        .unwrap();

        UserModuleRoleModel::assign_user_to_module(db, lecturer.id, module.id, Role::Lecturer)
            .await
            .unwrap();
        UserModuleRoleModel::assign_user_to_module(db, student.id, module.id, Role::Student)
            .await
            .unwrap();

        TestCtx {
            lecturer,
            student,
            module,
        }
    }

    fn get_req(uri: &str, token: &str) -> Request<AxumBody> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(AxumBody::empty())
            .unwrap()
    }

    fn post_json(uri: &str, token: &str, body: &Value) -> Request<AxumBody> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(AxumBody::from(body.to_string()))
            .unwrap()
    }

    fn put_req(uri: &str, token: &str) -> Request<AxumBody> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(AxumBody::empty())
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_session_as_lecturer() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);
        let body = serde_json::json!({ "title": "Week 5 lecture", "duration_minutes": 30 });

        let resp = app.oneshot(post_json(&uri, &token, &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Attendance session created");
        assert_eq!(json["data"]["module_id"], ctx.module.id);
        assert_eq!(json["data"]["created_by"], ctx.lecturer.id);
        assert_eq!(json["data"]["title"], "Week 5 lecture");
        assert_eq!(json["data"]["active"], true);
        assert_eq!(json["data"]["attended_count"], 0);
        assert_eq!(json["data"]["student_count"], 1);

        let pin = json["data"]["pin_code"].as_str().expect("pin present");
        assert_eq!(pin.len(), 6);
        assert!(pin.chars().all(|c| c.is_ascii_digit()));

        // The raw token never appears in session DTOs.
        assert!(json["data"].get("qr_token").is_none());
    }

    #[tokio::test]
    async fn test_create_session_validation_failures() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);

        let body = serde_json::json!({ "title": "Week 5", "duration_minutes": 0 });
        let resp = app
            .clone()
            .oneshot(post_json(&uri, &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().unwrap().contains("Duration"));

        let body = serde_json::json!({ "title": "", "duration_minutes": 30 });
        let resp = app
            .clone()
            .oneshot(post_json(&uri, &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = serde_json::json!({ "title": "   ", "duration_minutes": 30 });
        let resp = app.oneshot(post_json(&uri, &token, &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Title must not be blank");
    }

    #[tokio::test]
    async fn test_create_session_forbidden_for_student_and_outsider() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let body = serde_json::json!({ "title": "Not allowed", "duration_minutes": 30 });
        let uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
        let resp = app
            .clone()
            .oneshot(post_json(&uri, &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // A lecturer of a different module is an outsider here.
        let other = ModuleModel::create(app_state.db(), "OTH100", 2026, None, 8)
            .await
            .unwrap();
        let uri_other = format!("/api/modules/{}/attendance/sessions", other.id);
        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let resp = app
            .oneshot(post_json(&uri_other, &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_bypasses_module_role_check() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let admin = UserModel::create(
            app_state.db(),
            "sess_admin",
            "sess_admin@test.com",
            "The Admin",
            "password1",
            true,
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(admin.id, admin.admin);
        let uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);
        let body = serde_json::json!({ "title": "Admin session", "duration_minutes": 10 });

        let resp = app.oneshot(post_json(&uri, &token, &body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_end_session_is_one_way_and_idempotent() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let db = app_state.db();

        let sess = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "To end",
            Duration::minutes(30),
            Utc::now(),
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!(
            "/api/modules/{}/attendance/sessions/{}/end",
            ctx.module.id, sess.id
        );

        let resp = app.clone().oneshot(put_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["active"], false);
        assert!(json["data"]["ended_at"].is_string());

        // Ending again is a no-op, not an error.
        let resp = app.clone().oneshot(put_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["active"], false);

        let missing = format!(
            "/api/modules/{}/attendance/sessions/999999/end",
            ctx.module.id
        );
        let resp = app.oneshot(put_req(&missing, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_sessions_filters_sort_and_paging() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let db = app_state.db();

        let base = Utc::now() - Duration::hours(3);
        let s1 = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "Monday lecture",
            Duration::minutes(30),
            base,
        )
        .await
        .unwrap();
        let s2 = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "Wednesday practical",
            Duration::minutes(30),
            base + Duration::hours(1),
        )
        .await
        .unwrap();
        let s3 = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "Friday lecture",
            Duration::minutes(300),
            base + Duration::hours(2),
        )
        .await
        .unwrap();
        let _ = s1.clone().end(db, Utc::now()).await.unwrap();

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let base_uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);

        // Default order: newest first.
        let resp = app.clone().oneshot(get_req(&base_uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["total"], 3);
        assert_eq!(json["data"]["sessions"][0]["id"], s3.id);
        assert_eq!(json["data"]["sessions"][2]["id"], s1.id);

        // Active filter drops the ended session.
        let uri = format!("{base_uri}?active=true");
        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["total"], 2);

        // Title search.
        let uri = format!("{base_uri}?q=lecture");
        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["total"], 2);

        // Ascending title sort.
        let uri = format!("{base_uri}?sort=title");
        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["sessions"][0]["id"], s3.id); // "Friday lecture"
        assert_eq!(json["data"]["sessions"][1]["id"], s1.id); // "Monday lecture"
        assert_eq!(json["data"]["sessions"][2]["id"], s2.id); // "Wednesday practical"

        // Paging clamps and reports totals.
        let uri = format!("{base_uri}?per_page=2&page=2");
        let resp = app.oneshot(get_req(&uri, &token)).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["total"], 3);
        assert_eq!(json["data"]["page"], 2);
        assert_eq!(json["data"]["sessions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_session_with_counts() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let sess = SessionModel::create(
            app_state.db(),
            ctx.module.id,
            ctx.lecturer.id,
            "Counted",
            Duration::minutes(30),
            Utc::now(),
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!(
            "/api/modules/{}/attendance/sessions/{}",
            ctx.module.id, sess.id
        );
        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["id"], sess.id);
        assert_eq!(json["data"]["student_count"], 1);
        assert_eq!(json["data"]["attended_count"], 0);

        let missing = format!("/api/modules/{}/attendance/sessions/999999", ctx.module.id);
        let resp = app.clone().oneshot(get_req(&missing, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // A session id under the wrong module is not found.
        let other = ModuleModel::create(app_state.db(), "OTH101", 2026, None, 8)
            .await
            .unwrap();
        let (outsider_token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!("/api/modules/{}/attendance/sessions/{}", other.id, sess.id);
        let resp = app.oneshot(get_req(&uri, &outsider_token)).await.unwrap();
        // Lecturer holds no role in the other module, so the guard refuses
        // before the handler can report 404.
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_qr_payload_round_trips_and_closes_with_session() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let db = app_state.db();

        let sess = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "QR source",
            Duration::minutes(30),
            Utc::now(),
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(ctx.lecturer.id, ctx.lecturer.admin);
        let uri = format!(
            "/api/modules/{}/attendance/sessions/{}/qr",
            ctx.module.id, sess.id
        );

        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;

        let payload = util::qr::decode(json["data"].as_str().unwrap()).expect("payload decodes");
        assert_eq!(payload.session_id, sess.id);
        assert_eq!(payload.qr_token, sess.qr_token);
        assert_eq!(payload.expires_at, sess.expires_at);

        // Once ended, the payload is no longer served.
        let _ = sess.end(db, Utc::now()).await.unwrap();
        let resp = app.oneshot(get_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_active_session_lookup_for_students() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let db = app_state.db();

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
        let uri = format!("/api/modules/{}/attendance/active", ctx.module.id);

        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "No active session");

        let sess = SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            "Now open",
            Duration::minutes(30),
            Utc::now(),
        )
        .await
        .unwrap();

        let resp = app.clone().oneshot(get_req(&uri, &token)).await.unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["data"]["id"], sess.id);

        // Users with no role in the module cannot see the active session.
        let outsider = UserModel::create(
            db,
            "sess_outsider",
            "sess_outsider@test.com",
            "Outsider",
            "password1",
            false,
        )
        .await
        .unwrap();
        let (outsider_token, _) = generate_jwt(outsider.id, outsider.admin);
        let resp = app.oneshot(get_req(&uri, &outsider_token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_session_routes_require_authentication() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        let uri = format!("/api/modules/{}/attendance/sessions", ctx.module.id);
        let req = Request::builder()
            .method("GET")
            .uri(&uri)
            .body(AxumBody::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
