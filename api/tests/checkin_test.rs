mod helpers;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body as AxumBody,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, Utc};
    use sea_orm::EntityTrait;
    use serde_json::Value;
    use tower::ServiceExt;

    use api::auth::generate_jwt;
    use db::models::{
        attendance_record,
        attendance_session::Model as SessionModel,
        module::Model as ModuleModel,
        user::Model as UserModel,
        user_module_role::{Model as UserModuleRoleModel, Role},
    };

    use crate::helpers::app::make_test_app;

    struct TestCtx {
        lecturer: UserModel,
        tutor: UserModel,
        student: UserModel,
        module: ModuleModel,
    }

    async fn setup(db: &sea_orm::DatabaseConnection) -> TestCtx {
        let module = ModuleModel::create(db, "ATT301", 2026, Some("Check-in flows"), 8)
            .await
            .expect("create module");

        let lecturer = UserModel::create(
            db,
            "ci_lect",
            "ci_lect@test.com",
            "Checkin Lecturer",
            "password1",
            false,
        )
        .await
        .unwrap();
        let tutor = UserModel::create(
            db,
            "ci_tutor",
            "ci_tutor@test.com",
            "Checkin Tutor",
            "password1",
            false,
        )
        .await
        .unwrap();
        let student = UserModel::create(
            db,
            "ci_student",
            "ci_student@test.com",
            "Checkin Student",
            "password1",
            false,
        )
        .await
        .unwrap();

        UserModuleRoleModel::assign_user_to_module(db, lecturer.id, module.id, Role::Lecturer)
            .await
            .unwrap();
        UserModuleRoleModel::assign_user_to_module(db, tutor.id, module.id, Role::Tutor)
            .await
            .unwrap();
        UserModuleRoleModel::assign_user_to_module(db, student.id, module.id, Role::Student)
            .await
            .unwrap();

        TestCtx {
            lecturer,
            tutor,
            student,
            module,
        }
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

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn open_session(
        db: &sea_orm::DatabaseConnection,
        ctx: &TestCtx,
        title: &str,
    ) -> SessionModel {
        SessionModel::create(
            db,
            ctx.module.id,
            ctx.lecturer.id,
            title,
            Duration::minutes(30),
            Utc::now(),
        )
        .await
        .unwrap()
    }

    /// A six-digit PIN guaranteed not to match the session's.
    fn wrong_pin(session: &SessionModel) -> &'static str {
        if session.pin_code == "000000" {
            "000001"
        } else {
            "000000"
        }
    }

    #[tokio::test]
    async fn test_qr_checkin_records_attendance() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "QR lecture").await;

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
        let body = serde_json::json!({ "session_id": sess.id, "qr_token": sess.qr_token });

        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Attendance recorded");
        assert_eq!(json["data"]["ok"], true);
        assert_eq!(json["data"]["session_id"], sess.id);
        assert_eq!(json["data"]["method"], "qr");
        assert!(json["data"]["recorded_at"].is_string());

        let rec = attendance_record::Entity::find_by_id((sess.id, ctx.student.id))
            .one(app_state.db())
            .await
            .unwrap()
            .expect("record persisted");
        assert!(!rec.offline);
        assert!(rec.captured_at.is_none());
    }

    #[tokio::test]
    async fn test_pin_checkin_records_attendance() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "PIN lecture").await;

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
        let body = serde_json::json!({ "pin_code": sess.pin_code });

        let resp = app
            .oneshot(post_json("/api/attendance/check-in/pin", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["session_id"], sess.id);
        assert_eq!(json["data"]["method"], "pin");
    }

    #[tokio::test]
    async fn test_duplicate_checkin_conflicts_across_channels() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Once only").await;

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);

        let qr_body = serde_json::json!({ "session_id": sess.id, "qr_token": sess.qr_token });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &qr_body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Same student, other channel: the stored record wins.
        let pin_body = serde_json::json!({ "pin_code": sess.pin_code });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/pin", &token, &pin_body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json = body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["error"], "duplicate");
        assert_eq!(json["message"], "Attendance already recorded");

        // Replaying the original channel conflicts too.
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &qr_body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        // The first record is untouched.
        let rec = attendance_record::Entity::find_by_id((sess.id, ctx.student.id))
            .one(app_state.db())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rec.method.to_string(), "qr");
    }

    #[tokio::test]
    async fn test_expired_session_rejects_both_channels() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;

        // Opened an hour ago for five minutes: past its window but never
        // explicitly ended.
        let sess = SessionModel::create(
            app_state.db(),
            ctx.module.id,
            ctx.lecturer.id,
            "Long over",
            Duration::minutes(5),
            Utc::now() - Duration::hours(1),
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);

        let body = serde_json::json!({ "session_id": sess.id, "qr_token": sess.qr_token });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "expired");
        assert_eq!(json["message"], "Session is no longer open for check-in");

        // The PIN still resolves (the session is active), but the window has
        // closed. The PIN channel folds that into its generic message.
        let body = serde_json::json!({ "pin_code": sess.pin_code });
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/pin", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "expired");
        assert_eq!(json["message"], "Invalid or expired PIN");
    }

    #[tokio::test]
    async fn test_ended_session_rejects_both_channels() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Ended early").await;
        let pin = sess.pin_code.clone();
        let qr_token = sess.qr_token.clone();
        let sess_id = sess.id;
        let _ = sess.end(app_state.db(), Utc::now()).await.unwrap();

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);

        // An ended session's PIN looks like no PIN at all.
        let body = serde_json::json!({ "pin_code": pin });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/pin", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "invalid_pin");
        assert_eq!(json["message"], "Invalid or expired PIN");

        // The QR token still names the session, so the closure is reported.
        let body = serde_json::json!({ "session_id": sess_id, "qr_token": qr_token });
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "expired");
    }

    #[tokio::test]
    async fn test_unknown_token_and_wrong_pin() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Guess-proof").await;

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);

        // Right session id, wrong token.
        let body = serde_json::json!({ "session_id": sess.id, "qr_token": "deadbeef" });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "not_found");
        assert_eq!(json["message"], "Attendance session not found");

        // Unknown session id.
        let body = serde_json::json!({ "session_id": 999999, "qr_token": sess.qr_token });
        let resp = app
            .clone()
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // Well-formed PIN that matches no active session.
        let body = serde_json::json!({ "pin_code": wrong_pin(&sess) });
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/pin", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "invalid_pin");
    }

    #[tokio::test]
    async fn test_malformed_checkin_requests() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let _sess = open_session(app_state.db(), &ctx, "Strict inputs").await;

        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);

        // PIN must be exactly six digits.
        for bad in ["12345", "1234567", "12a456", ""] {
            let body = serde_json::json!({ "pin_code": bad });
            let resp = app
                .clone()
                .oneshot(post_json("/api/attendance/check-in/pin", &token, &body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "pin {bad:?}");
            let json = body_json(resp).await;
            assert_eq!(json["data"]["error"], "invalid_request");
        }

        // Empty QR token never reaches the store.
        let body = serde_json::json!({ "session_id": 1, "qr_token": "" });
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_checkin_requires_student_role() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Students only").await;

        let body = serde_json::json!({ "session_id": sess.id, "qr_token": sess.qr_token });

        // Staff of the module are not attendees.
        for staff in [&ctx.lecturer, &ctx.tutor] {
            let (token, _) = generate_jwt(staff.id, staff.admin);
            let resp = app
                .clone()
                .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }

        // A student of some other module is a stranger here.
        let other_module = ModuleModel::create(app_state.db(), "OTH300", 2026, None, 8)
            .await
            .unwrap();
        let outsider = UserModel::create(
            app_state.db(),
            "ci_outsider",
            "ci_outsider@test.com",
            "Elsewhere Student",
            "password1",
            false,
        )
        .await
        .unwrap();
        UserModuleRoleModel::assign_user_to_module(
            app_state.db(),
            outsider.id,
            other_module.id,
            Role::Student,
        )
        .await
        .unwrap();

        let (token, _) = generate_jwt(outsider.id, outsider.admin);
        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Nothing was written for any of them.
        let n = db::models::attendance_session::Model::attended_count(app_state.db(), sess.id)
            .await
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_checkin_requires_authentication() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Token required").await;

        let body = serde_json::json!({ "session_id": sess.id, "qr_token": sess.qr_token });
        let req = Request::builder()
            .method("POST")
            .uri("/api/attendance/check-in/qr")
            .header("Content-Type", "application/json")
            .body(AxumBody::from(body.to_string()))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_offline_replay_preserves_capture_time() {
        let (app, app_state) = make_test_app().await;
        let ctx = setup(app_state.db()).await;
        let sess = open_session(app_state.db(), &ctx, "Patchy wifi").await;

        // Scanned ten minutes ago, replayed now while the window is still
        // open.
        let scanned_at = Utc::now() - Duration::minutes(10);
        let (token, _) = generate_jwt(ctx.student.id, ctx.student.admin);
        let body = serde_json::json!({
            "session_id": sess.id,
            "qr_token": sess.qr_token,
            "captured_at": scanned_at.to_rfc3339(),
        });

        let resp = app
            .oneshot(post_json("/api/attendance/check-in/qr", &token, &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["method"], "qr_offline_sync");

        let rec = attendance_record::Entity::find_by_id((sess.id, ctx.student.id))
            .one(app_state.db())
            .await
            .unwrap()
            .unwrap();
        assert!(rec.offline);
        let captured = rec.captured_at.expect("capture time kept");
        assert_eq!(captured.timestamp(), scanned_at.timestamp());
    }
}
