use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{any, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, proxy, public};
use crate::middleware::require_auth;
use crate::state::AppState;

/// The full HTTP surface. Users and tracking are served locally unless a
/// sibling service URL is configured, in which case they are forwarded.
pub fn app(state: AppState) -> Router {
    let max_body = state.config.server.max_request_size_bytes;

    let mut router = Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/apispec.json", get(public::system::apispec))
        .merge(public_series_routes())
        // Protected
        .merge(authenticated(&state, me_routes()))
        .merge(authenticated(&state, series_routes()))
        .merge(authenticated(&state, lesson_routes()));

    router = if state.user_proxy.is_some() {
        router.merge(user_proxy_routes())
    } else {
        router.merge(authenticated(&state, user_routes()))
    };

    router = if state.tracking_proxy.is_some() {
        router.merge(tracking_proxy_routes())
    } else {
        router.merge(authenticated(&state, tracking_routes()))
    };

    router
        // Global middleware
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authenticated(state: &AppState, routes: Router<AppState>) -> Router<AppState> {
    routes.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

fn public_series_routes() -> Router<AppState> {
    use public::series;

    Router::new()
        .route("/api/v1/series", get(series::list))
        .route("/api/v1/series/search", get(series::search))
        .route("/api/v1/series/:serie_id", get(series::get))
}

fn me_routes() -> Router<AppState> {
    Router::new().route("/api/me-test", get(protected::me::me_test))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route(
            "/api/v1/users/profile",
            get(users::current_profile).post(users::create_profile),
        )
        .route("/api/v1/users/sync", post(users::sync))
        .route("/api/v1/users/:user_id", get(users::get).put(users::update))
}

fn series_routes() -> Router<AppState> {
    use protected::series;

    Router::new()
        .route("/api/v1/series", post(series::create))
        .route("/api/v1/series/subscribed", get(series::subscribed))
        .route("/api/v1/series/subscriptions", get(series::subscribed))
        .route("/api/v1/series/created", get(series::created))
        .route("/api/v1/series/me", get(series::created))
        .route(
            "/api/v1/series/:serie_id",
            axum::routing::patch(series::update).delete(series::delete),
        )
        .route("/api/v1/series/:serie_id/subscribe", post(series::subscribe))
        .route("/api/v1/series/:serie_id/unsubscribe", post(series::unsubscribe))
        .route("/api/v1/series/:serie_id/notify", post(series::notify))
}

fn lesson_routes() -> Router<AppState> {
    use protected::lessons;

    Router::new()
        .route(
            "/api/v1/series/:serie_id/lessons",
            get(lessons::list).post(lessons::create),
        )
        .route(
            "/api/v1/series/:serie_id/lessons/:lesson_id",
            get(lessons::get)
                .patch(lessons::update)
                .delete(lessons::delete),
        )
        .route(
            "/api/v1/series/:serie_id/lessons/:lesson_id/documents",
            axum::routing::delete(lessons::delete_document),
        )
}

fn tracking_routes() -> Router<AppState> {
    use protected::tracking;

    Router::new()
        .route("/api/v1/tracking/lesson/enter", post(tracking::enter))
        .route("/api/v1/tracking/lesson/exit", post(tracking::exit))
        .route("/api/v1/tracking/lesson/focus", post(tracking::focus))
        .route(
            "/api/v1/tracking/user/:user_id/current",
            get(tracking::current),
        )
}

fn user_proxy_routes() -> Router<AppState> {
    Router::new()
        .route(proxy::USERS_PREFIX, any(proxy::users))
        .route("/api/v1/users/*path", any(proxy::users))
}

fn tracking_proxy_routes() -> Router<AppState> {
    Router::new()
        .route(proxy::TRACKING_PREFIX, any(proxy::tracking))
        .route("/api/v1/tracking/*path", any(proxy::tracking))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insecure_config, tokens, TestServices};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn token(sub: &str, email: &str) -> String {
        tokens::sign(json!({ "sub": sub, "email": email, "token_use": "id" }))
    }

    fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_without_database() {
        let t = TestServices::new();
        let app = app(t.state.clone());

        let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "not_configured");
        assert_eq!(body["auth"], "configured");

        let (status, body) = send(&app, request(Method::GET, "/", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn apispec_is_served_as_json() {
        let app = app(TestServices::new().state);
        let (status, body) = send(&app, request(Method::GET, "/apispec.json", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["openapi"].is_string());
        assert!(body["paths"]["/api/v1/series"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        let app = app(TestServices::new().state);

        let (status, body) = send(&app, request(Method::GET, "/api/me-test", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "unauthorized");

        let (status, body) =
            send(&app, request(Method::GET, "/api/me-test", Some("garbage"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");

        let tok = token("u1", "u1@example.com");
        let (status, body) = send(&app, request(Method::GET, "/api/me-test", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "authenticated");
        assert_eq!(body["user"]["userId"], "u1");
    }

    #[tokio::test]
    async fn unconfigured_auth_is_a_configuration_error() {
        let t = TestServices::with_config(crate::config::AppConfig::development());
        let app = app(t.state);
        let tok = token("u1", "u1@example.com");

        let (status, body) = send(&app, request(Method::GET, "/api/me-test", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "configuration_error");
    }

    #[tokio::test]
    async fn profile_is_created_on_first_read() {
        let app = app(TestServices::new().state);
        let tok = token("u1", "ana@example.com");

        let (status, body) =
            send(&app, request(Method::GET, "/api/v1/users/profile", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User profile created automatically");
        assert_eq!(body["data"]["email"], "ana@example.com");

        let (status, body) =
            send(&app, request(Method::GET, "/api/v1/users/profile", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["userId"], "u1");

        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                "/api/v1/users/u2",
                Some(&tok),
                Some(json!({ "name": "Mallory" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn profile_bodies_are_checked_after_ownership() {
        let app = app(TestServices::new().state);
        let tok = token("u1", "ana@example.com");
        send(&app, request(Method::GET, "/api/v1/users/profile", Some(&tok), None)).await;

        // Someone else's profile is refused before the body is looked at.
        let (status, body) =
            send(&app, request(Method::PUT, "/api/v1/users/u2", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let malformed = Request::builder()
            .method(Method::PUT)
            .uri("/api/v1/users/u1")
            .header(header::AUTHORIZATION, format!("Bearer {}", tok))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "bad_request");

        let (status, body) =
            send(&app, request(Method::PUT, "/api/v1/users/u1", Some(&tok), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = send(
            &app,
            request(Method::PUT, "/api/v1/users/u1", Some(&tok), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No fields to update");

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/users/profile",
                Some(&tok),
                Some(json!({ "name": 42 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn series_lifecycle_over_http() {
        let app = app(TestServices::new().state);
        let owner = token("instructor-1", "t@example.com");

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/series",
                Some(&owner),
                Some(json!({ "serie_title": "Rust", "isPublish": "true" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["serie_title"], "Rust");
        assert_eq!(body["data"]["isPublish"], true);
        let id = body["data"]["_id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, request(Method::GET, "/api/v1/series", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/series/{}", id);
        let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["serie_user"], "instructor-1");

        let (status, _) = send(&app, request(Method::GET, "/api/v1/series/not-an-id", None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, request(Method::GET, "/api/v1/series/search", None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/series/search?keyword=RUS", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["_id"], id.as_str());

        let lessons_uri = format!("/api/v1/series/{}/lessons", id);
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &lessons_uri,
                Some(&owner),
                Some(json!({ "lesson_title": "Intro" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["lesson_title"], "Intro");

        let (status, body) = send(&app, request(Method::GET, &lessons_uri, Some(&owner), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        // Patch without auth never reaches the handler.
        let (status, _) = send(
            &app,
            request(Method::PATCH, &uri, None, Some(json!({ "serie_title": "X" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&owner), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn subscribe_and_notify_over_http() {
        let t = TestServices::new();
        let app = app(t.state.clone());
        let owner = token("instructor-1", "t@example.com");
        let student = token("student", "s@example.com");

        let (_, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/series",
                Some(&owner),
                Some(json!({ "serie_title": "Rust" })),
            ),
        )
        .await;
        let id = body["data"]["_id"].as_str().unwrap().to_string();

        let subscribe = format!("/api/v1/series/{}/subscribe", id);
        let (status, body) = send(&app, request(Method::POST, &subscribe, Some(&student), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");

        send(&app, request(Method::GET, "/api/v1/users/profile", Some(&student), None)).await;
        let (status, body) = send(&app, request(Method::POST, &subscribe, Some(&student), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["alreadySubscribed"], false);

        let notify = format!("/api/v1/series/{}/notify", id);
        let (status, _) = send(
            &app,
            request(Method::POST, &notify, Some(&owner), Some(json!({ "title": "Hi" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                &notify,
                Some(&owner),
                Some(json!({ "title": "Hi", "message": "Class moved" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["recipient_count"], 1);
        assert_eq!(t.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn tracking_round_trip_over_http() {
        let app = app(TestServices::new().state);
        let tok = token("u1", "u1@example.com");

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/tracking/lesson/enter",
                Some(&tok),
                Some(json!({ "lesson_id": "l1", "serie_id": "s1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/tracking/lesson/enter",
                Some(&tok),
                Some(json!({ "user_id": "u1", "lesson_id": "l1", "serie_id": "s1", "tab_id": "t1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            request(Method::GET, "/api/v1/tracking/user/u1/current", Some(&tok), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_in_lesson"], true);
        assert_eq!(body["data"]["total_active_tabs"], 1);
    }

    #[tokio::test]
    async fn user_routes_are_forwarded_when_configured() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/users/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "from": "upstream" })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = insecure_config();
        config.services.user_service_url = Some(server.uri());
        let app = app(TestServices::with_config(config).state);

        let (status, body) =
            send(&app, request(Method::GET, "/api/v1/users/profile", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "upstream");
    }

    #[tokio::test]
    async fn tracking_proxy_enriches_current_lesson() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let mut config = insecure_config();
        config.services.tracking_service_url = Some(server.uri());
        let t = TestServices::with_config(config);
        let app = app(t.state.clone());

        let owner = crate::testing::caller("instructor-1", "t@example.com");
        let serie = t
            .series
            .create(
                &owner,
                crate::services::SerieForm {
                    title: Some("Rust".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let lesson = t
            .lessons
            .create(
                &owner,
                &serie.id.to_string(),
                crate::services::LessonForm {
                    title: Some("Traits".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/api/tracking/user/u1/current"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "trk-42")
                    .insert_header("cache-control", "no-store")
                    .set_body_json(json!({
                        "user_id": "u1",
                        "is_in_lesson": true,
                        "lesson_id": lesson.id.to_string(),
                        "serie_id": serie.id.to_string()
                    })),
            )
            .mount(&server)
            .await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/tracking/user/u1/current", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "trk-42");
        assert_eq!(response.headers()["cache-control"], "no-store");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["lesson_data"]["lesson_title"], "Traits");
    }
}
