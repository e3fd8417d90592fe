//! Router assembly: HTTP endpoints, WebSocket upgrade, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - quiz, riddle, fun fact and creative writing endpoints
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        .route("/health", get(http::http_health))
        // Quiz
        .route("/quiz/question", post(http::http_quiz_question))
        .route("/quiz/answer", post(http::http_quiz_answer))
        .route("/quiz/break", post(http::http_quiz_break))
        .route("/quiz/reset", post(http::http_quiz_reset))
        // Riddle
        .route("/riddle", get(http::http_get_riddle))
        .route("/riddle/check-answer", post(http::http_riddle_check_answer))
        .route("/riddle/break-options", get(http::http_riddle_break_options))
        .route("/riddle/reset", post(http::http_riddle_reset))
        // Fun facts
        .route("/fun-fact", get(http::http_fun_fact))
        // Creative writing
        .route("/prompt", post(http::http_create_prompt))
        .route("/evaluate/:id", post(http::http_evaluate))
        .route("/scores/:id", get(http::http_scores))
        .route("/challenge/:id", get(http::http_challenge_status))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::llm::testing::{shared, ScriptedCapability};
    use crate::llm::SharedCapability;

    const QUIZ: &str = "Question (Complexity Level 1): Which token pays gas on BNB Smart Chain?\nOptions:\nA) ETH\nB) BNB\nC) BTC\nD) USDT\nHint: Same name as the chain.\nANSWER: B";

    fn app(cap: SharedCapability) -> Router {
        build_router(Arc::new(AppState::with_capability(&AppConfig::default(), cap)))
    }

    fn json_request(method: &str, uri: &str, session: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header(http::SESSION_HEADER, session)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_components() {
        let res = app(None).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = body_json(res).await;
        assert_eq!(v["status"], "ok");
        assert_eq!(v["components"]["fun_facts"], false);
        assert_eq!(v["components"]["llm"], "unavailable");
    }

    #[tokio::test]
    async fn quiz_flow_per_session() {
        let cap = ScriptedCapability::replying(&[QUIZ]);
        let app = app(shared(&cap));

        let res = app.clone().oneshot(json_request("POST", "/quiz/question", "s1", json!({}))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let q = body_json(res).await;
        assert!(q["question"].as_str().unwrap().starts_with("Question (Complexity Level 1):"));
        assert_eq!(q["options"][1], "B) BNB");

        // another session has nothing to answer
        let res = app.clone().oneshot(json_request("POST", "/quiz/answer", "s2", json!({"answer": "B"}))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "bad_request");

        let res = app.clone().oneshot(json_request("POST", "/quiz/answer", "s1", json!({"answer": "A"}))).await.unwrap();
        let v = body_json(res).await;
        assert_eq!(v["correct"], false);
        assert_eq!(v["message"], "Wrong! 4 attempts remaining");
        assert_eq!(v["hint"], "Same name as the chain.");

        let res = app.clone().oneshot(json_request("POST", "/quiz/answer", "s1", json!({"answer": "b"}))).await.unwrap();
        let v = body_json(res).await;
        assert_eq!(v["correct"], true);
        assert_eq!(v["complexity"], 2);
        assert!(v.get("attempts_remaining").is_none());

        let res = app.oneshot(json_request("POST", "/quiz/reset", "s1", json!({}))).await.unwrap();
        assert_eq!(body_json(res).await, json!({"message": "Game reset successfully", "status": true}));
    }

    #[tokio::test]
    async fn generation_failure_is_bad_gateway_with_placeholder() {
        let res = app(None).oneshot(get_request("/riddle")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let v = body_json(res).await;
        assert_eq!(v["riddle"], "Technical difficulty encountered");
        assert_eq!(v["hint"], "Please check API configuration");
    }

    #[tokio::test]
    async fn riddle_no_active_is_a_plain_outcome() {
        let res = app(None)
            .oneshot(json_request("POST", "/riddle/check-answer", "s", json!({"user_answer": "BNB"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let v = body_json(res).await;
        assert_eq!(v["correct"], false);
        assert_eq!(v["message"], "No active question");
    }

    #[tokio::test]
    async fn break_endpoints_fall_back_to_fixed_list() {
        let app = app(None);
        let res = app.clone().oneshot(json_request("POST", "/quiz/break", "s", json!({}))).await.unwrap();
        let v = body_json(res).await;
        assert_eq!(v["options"].as_array().unwrap().len(), 6);

        let res = app.oneshot(get_request("/riddle/break-options")).await.unwrap();
        let v = body_json(res).await;
        assert!(v["break_options"].as_str().unwrap().starts_with("Sure! Here are some fun options:"));
    }

    #[tokio::test]
    async fn fun_fact_requires_capability() {
        let res = app(None).oneshot(get_request("/fun-fact")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let cap = ScriptedCapability::replying(&["**Fact:** BNB burns are quarterly."]);
        let res = app(shared(&cap)).oneshot(get_request("/fun-fact?topic=Token%20Burns")).await.unwrap();
        let v = body_json(res).await;
        assert_eq!(v["success"], true);
        assert_eq!(v["topic"], "Token Burns");
        assert_eq!(v["facts"], "Fact: BNB burns are quarterly.");
    }

    #[tokio::test]
    async fn creative_writing_lifecycle() {
        let app = app(None);

        let res = app
            .clone()
            .oneshot(json_request("POST", "/prompt", "s", json!({"duration": 25, "time_unit": "hours"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = app
            .clone()
            .oneshot(json_request("POST", "/prompt", "s", json!({"duration": 2, "time_unit": "hours"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let created = body_json(res).await;
        assert_eq!(created["status"], "active");
        assert_eq!(created["duration"], json!({"value": 2, "unit": "hours"}));
        let id = created["id"].as_str().unwrap().to_string();

        let res = app.clone().oneshot(get_request(&format!("/challenge/{id}"))).await.unwrap();
        let v = body_json(res).await;
        assert_eq!(v["prompt"], "Write about blockchain technology's future.");
        assert!(v["evaluation"].is_null());

        let res = app.clone().oneshot(get_request(&format!("/scores/{id}"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        // no capability: evaluation fails and the challenge is marked failed
        let res = app
            .clone()
            .oneshot(json_request("POST", &format!("/evaluate/{id}"), "s", json!({"submission": "My story"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        let res = app.clone().oneshot(get_request(&format!("/challenge/{id}"))).await.unwrap();
        assert_eq!(body_json(res).await["status"], "failed");

        let unknown = uuid::Uuid::new_v4();
        let res = app.oneshot(get_request(&format!("/challenge/{unknown}"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
