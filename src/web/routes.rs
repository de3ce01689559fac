//! Route table.

use crate::web::{handlers, middleware::identity_middleware, state::AppState};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/me", get(handlers::me::get_me).put(handlers::me::update_me))
        .route("/me/summary", get(handlers::me::get_summary))
        .route("/me/summary.txt", get(handlers::me::get_summary_text))
        .route("/me/sessions", get(handlers::me::upcoming_sessions))
        .route("/profiles", get(handlers::profile::list_profiles))
        .route("/profiles/{id}/role", put(handlers::profile::set_role))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/course-groups",
            get(handlers::course::list_groups).post(handlers::course::create_group),
        )
        .route(
            "/course-groups/{id}",
            axum::routing::delete(handlers::course::delete_group),
        )
        .route(
            "/courses",
            get(handlers::course::list_courses).post(handlers::course::create_course),
        )
        .route(
            "/courses/{id}",
            get(handlers::course::get_course)
                .put(handlers::course::update_course)
                .delete(handlers::course::deactivate_course),
        )
        .route(
            "/courses/{id}/sessions",
            get(handlers::course::list_sessions).post(handlers::course::create_session),
        )
        .route(
            "/courses/{id}/sessions/generate",
            post(handlers::course::generate_sessions),
        )
        .route(
            "/courses/{id}/enrollments",
            get(handlers::course::list_enrollments),
        )
        .route(
            "/courses/{id}/enrollment",
            post(handlers::course::enroll).delete(handlers::course::cancel_enrollment),
        )
        .route("/courses/{id}/summary", get(handlers::course::course_summary))
        .route(
            "/sessions/{id}/cancel",
            post(handlers::session::cancel_session),
        )
        .route(
            "/sessions/{id}/rollcall",
            get(handlers::session::get_roster).post(handlers::session::take_rollcall),
        )
}

fn request_routes() -> Router<AppState> {
    use handlers::requests as r;
    Router::new()
        .route("/leave-requests", get(r::list_leave).post(r::create_leave))
        .route("/leave-requests/{id}/review", post(r::review_leave))
        .route("/leave-requests/{id}/withdraw", post(r::withdraw_leave))
        .route("/makeup-requests", get(r::list_makeup).post(r::create_makeup))
        .route("/makeup-requests/{id}/review", post(r::review_makeup))
        .route("/makeup-requests/{id}/withdraw", post(r::withdraw_makeup))
        .route(
            "/transfer-requests",
            get(r::list_transfer).post(r::create_transfer),
        )
        .route("/transfer-requests/{id}/review", post(r::review_transfer))
        .route("/transfer-requests/{id}/withdraw", post(r::withdraw_transfer))
}

fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/card/packages", get(handlers::card::list_packages))
        .route("/card/balance", get(handlers::card::get_balance))
        .route("/card/transactions", get(handlers::card::list_transactions))
        .route(
            "/card/orders",
            get(handlers::card::list_orders).post(handlers::card::create_order),
        )
        .route(
            "/card/orders/{id}/confirm",
            post(handlers::card::confirm_order),
        )
        .route("/card/orders/{id}/cancel", post(handlers::card::cancel_order))
        .route("/card/adjustments", post(handlers::card::adjust_balance))
        .route("/config", get(handlers::config::list_values))
        .route(
            "/config/{key}",
            get(handlers::config::get_value).put(handlers::config::set_value),
        )
}

/// Builds the full application router with middleware applied.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(member_routes())
        .merge(catalog_routes())
        .merge(request_routes())
        .merge(card_routes());

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        config::settings::{AppConfig, CardPackage},
        core::status::Role,
        errors::Result,
        test_utils::*,
        web::middleware::USER_ID_HEADER,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn test_router() -> Result<Router> {
        let db = setup_test_db().await?;
        create_test_profile(&db, "admin", Role::Admin).await?;
        create_test_profile(&db, "teacher", Role::Teacher).await?;
        create_test_profile(&db, "a", Role::Student).await?;
        let config = AppConfig {
            card_packages: vec![CardPackage {
                name: "10-class card".to_string(),
                credits: 10,
                price: 150.0,
            }],
            ..Default::default()
        };
        Ok(build_router(AppState::new(db, config)))
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_is_public() -> Result<()> {
        let router = test_router().await?;
        let (status, body) = call(&router, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_input_uses_error_envelope() -> Result<()> {
        let router = test_router().await?;

        let request = Request::builder()
            .method("POST")
            .uri("/api/card/orders")
            .header(USER_ID_HEADER, "a")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) =
            call(&router, "POST", "/api/courses/abc/enrollment", Some("a"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) =
            call(&router, "GET", "/api/me/sessions?limit=many", Some("a"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_identity_is_rejected() -> Result<()> {
        let router = test_router().await?;
        let (status, body) = call(&router, "GET", "/api/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_registration() -> Result<()> {
        let router = test_router().await?;
        let (status, body) = call(&router, "GET", "/api/me", Some("newbie"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "PROFILE_NOT_FOUND");

        let (status, body) = call(
            &router,
            "PUT",
            "/api/me",
            Some("newbie"),
            Some(json!({ "full_name": "New Member", "email": "new@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "student");
        assert_eq!(body["data"]["card_balance"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_course_admin_only_and_enrollment() -> Result<()> {
        let router = test_router().await?;
        let course = json!({
            "name": "Salsa",
            "capacity": 1,
            "weekday": 2,
            "start_time": "19:00",
            "duration_minutes": 60,
            "credits_per_session": 1
        });

        let (status, body) =
            call(&router, "POST", "/api/courses", Some("a"), Some(course.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");

        let (status, body) = call(&router, "POST", "/api/courses", Some("admin"), Some(course)).await;
        assert_eq!(status, StatusCode::OK);
        let id = body["data"]["id"].as_i64().unwrap();

        let uri = format!("/api/courses/{id}/enrollment");
        let (status, body) = call(&router, "POST", &uri, Some("a"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["enrollment"]["status"], "enrolled");

        let (status, body) = call(&router, "POST", &uri, Some("a"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_ENROLLED");

        let (_, body) = call(&router, "GET", &format!("/api/courses/{id}"), Some("a"), None).await;
        assert_eq!(body["data"]["enrolled_count"], 1);
        assert_eq!(body["data"]["seats_left"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_card_order_flow() -> Result<()> {
        let router = test_router().await?;
        let (status, body) = call(
            &router,
            "POST",
            "/api/card/orders",
            Some("a"),
            Some(json!({ "package_name": "10-class card" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pending");
        let order_id = body["data"]["id"].as_i64().unwrap();

        let confirm = format!("/api/card/orders/{order_id}/confirm");
        let (status, _) = call(&router, "POST", &confirm, Some("a"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&router, "POST", &confirm, Some("admin"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&router, "GET", "/api/card/balance", Some("a"), None).await;
        assert_eq!(body["data"]["balance"], 10);

        let (status, body) = call(
            &router,
            "POST",
            "/api/card/orders",
            Some("a"),
            Some(json!({ "package_name": "gold card" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "PACKAGE_NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_member_summary_text() -> Result<()> {
        let router = test_router().await?;
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/me/summary.txt")
                    .header(USER_ID_HEADER, "a")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Member: User a (a)"));
        Ok(())
    }

    #[tokio::test]
    async fn test_config_requires_admin() -> Result<()> {
        let router = test_router().await?;
        let (status, _) = call(&router, "GET", "/api/config/charge_absent", Some("a"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(
            &router,
            "PUT",
            "/api/config/charge_absent",
            Some("admin"),
            Some(json!({ "value": "false" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["value"], "false");

        let (_, body) =
            call(&router, "GET", "/api/config/charge_absent", Some("admin"), None).await;
        assert_eq!(body["data"]["value"], "false");
        Ok(())
    }
}
