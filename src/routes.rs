use crate::handlers;
use crate::state::AppState;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/communities/",
            get(handlers::list_communities).post(handlers::create_community),
        )
        .route("/communities/:community_id", get(handlers::get_community))
        .route(
            "/communities/:community_id/members",
            post(handlers::join_community).delete(handlers::leave_community),
        )
        .route(
            "/community/:community_id/quizzes/",
            get(handlers::list_quizzes).post(handlers::create_quiz),
        )
        .route(
            "/community/:community_id/quizzes/:quiz_id",
            get(handlers::get_quiz).delete(handlers::delete_quiz),
        )
        .route("/quizzes/:community_id/:quiz_id", put(handlers::update_quiz))
        .route(
            "/community/:community_id/quizzes/:quiz_id/questions",
            get(handlers::list_questions).post(handlers::create_question),
        )
        .route(
            "/community/:community_id/quizzes/:quiz_id/questions/:question_id",
            get(handlers::get_question)
                .put(handlers::update_question)
                .delete(handlers::delete_question),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::unsigned_token;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: Method, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", unsigned_token(user)));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_router(AppState::new(None));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mutations_require_a_token() {
        let app = build_router(AppState::new(None));
        let (status, body) = send(
            &app,
            json_request(Method::POST, "/communities/", None, json!({"community_id": "c1", "community_name": "Rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn unknown_question_type_is_rejected_on_write() {
        let app = build_router(AppState::new(None));
        let (status, _) = send(
            &app,
            json_request(Method::POST, "/communities/", Some("alice"), json!({"community_id": "c1", "community_name": "Rust"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/community/c1/quizzes/",
                Some("alice"),
                json!({
                    "quiz_id": "q1",
                    "community_id": "c1",
                    "title": "Traits",
                    "description": "Dispatch",
                    "questions": [{
                        "question_id": "x",
                        "question_text": "?",
                        "question_type": "essay",
                        "options": [],
                        "answer": []
                    }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_VARIANT");
    }

    #[tokio::test]
    async fn only_owners_may_delete() {
        let app = build_router(AppState::new(None));
        send(
            &app,
            json_request(Method::POST, "/communities/", Some("alice"), json!({"community_id": "c1", "community_name": "Rust"})),
        )
        .await;
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/community/c1/quizzes/",
                Some("alice"),
                json!({
                    "quiz_id": "q1",
                    "community_id": "c1",
                    "title": "Geo",
                    "description": "Capitals",
                    "questions": [{
                        "question_id": "a",
                        "question_text": "Capital of France?",
                        "question_type": "flashcard",
                        "answer": "Paris"
                    }]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, json_request(Method::DELETE, "/community/c1/quizzes/q1", Some("bob"), Value::Null)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        let (status, _) = send(&app, json_request(Method::DELETE, "/community/c1/quizzes/q1", Some("alice"), Value::Null)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, json_request(Method::GET, "/community/c1/quizzes/q1", None, Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
