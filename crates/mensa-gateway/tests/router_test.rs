//! Router tests with an in-process provider stub

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use mensa_core::{FetchError, MenuFetcher, MenuQuery};
use mensa_gateway::{Gateway, GatewayConfig, GatewayState, TurnResponse};
use serde_json::{json, Value};
use tower::ServiceExt;

const MENU: &str = r#"
<div class="splGroupWrapper">
  <div class="splGroup">Suppen</div>
  <div class="splMeal" data-kennz="27">
    <span class="bold">Linsensuppe</span>
    <div class="col-xs-12 col-md-3 text-right">&euro; 0,75/1,35/1,65</div>
  </div>
</div>
<div class="splGroupWrapper">
  <div class="splGroup">Desserts</div>
  <div class="splMeal"><span class="bold">Obstsalat</span></div>
</div>
"#;

#[derive(Debug, Default)]
struct StubFetcher {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

#[async_trait::async_trait]
impl MenuFetcher for StubFetcher {
    async fn fetch(&self, _query: &MenuQuery) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(MENU.to_string())
    }
}

fn gateway_with(config: GatewayConfig, fetcher: Arc<StubFetcher>) -> (Gateway, Router) {
    let gateway = Gateway::from_state(GatewayState::with_fetcher(config, fetcher));
    let router = gateway.build_router();
    (gateway, router)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn post_turn(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/turn")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (_, router) = gateway_with(GatewayConfig::default(), Arc::new(StubFetcher::default()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], mensa_gateway::VERSION);
}

#[tokio::test]
async fn test_conversation_over_http() {
    let fetcher = Arc::new(StubFetcher::default());
    let (_, router) = gateway_with(GatewayConfig::default(), fetcher.clone());

    let (status, body) = send(&router, post_turn(json!({"intent": "ask_menu"}))).await;
    assert_eq!(status, StatusCode::OK);
    let first: TurnResponse = serde_json::from_value(body).unwrap();
    assert_eq!(first.responses[0].kind(), "ask_for_canteen");
    assert!(first.text[0].starts_with("Which canteen would you like to check?"));
    assert!(first.session_id.starts_with("session:"));

    let (_, body) = send(
        &router,
        post_turn(json!({
            "session_id": first.session_id,
            "intent": "inform",
            "entities": {"canteen": "Vegan"}
        })),
    )
    .await;
    assert_eq!(body["state"], "awaiting_category");
    assert_eq!(body["responses"][0]["type"], "got_it_checking_canteen");
    assert_eq!(body["responses"][1]["categories"], json!(["Suppen", "Desserts"]));

    let (_, body) = send(
        &router,
        post_turn(json!({
            "session_id": first.session_id,
            "intent": "select_category",
            "entities": {"category": "suppen"}
        })),
    )
    .await;
    assert_eq!(body["state"], "showing_category");
    assert_eq!(body["responses"][0]["items"][0]["name"], "Linsensuppe");
    let text = body["text"][0].as_str().unwrap();
    assert!(text.contains("• Linsensuppe - € 0,75/1,35/1,65"));
    assert!(text.contains("Allergens: Celery"));

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_intent_is_rejected() {
    let (_, router) = gateway_with(GatewayConfig::default(), Arc::new(StubFetcher::default()));

    let (status, body) = send(&router, post_turn(json!({"intent": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("intent"));
}

#[tokio::test]
async fn test_slow_turn_times_out_without_touching_session() {
    let fetcher = Arc::new(StubFetcher {
        delay: Some(Duration::from_secs(3)),
        ..Default::default()
    });
    let config = GatewayConfig::default().with_turn_timeout(1);
    let (gateway, router) = gateway_with(config, fetcher);

    let (status, _) = send(
        &router,
        post_turn(json!({"session_id": "slow", "intent": "ask_menu", "entities": {"canteen": "march"}})),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

    let state = gateway.state();
    assert!(state.store.snapshot(&"slow".into()).await.is_none());
}

#[tokio::test]
async fn test_reset_session_endpoint() {
    let (gateway, router) = gateway_with(GatewayConfig::default(), Arc::new(StubFetcher::default()));

    send(
        &router,
        post_turn(json!({"session_id": "abc", "intent": "ask_menu", "entities": {"canteen": "hardenberg"}})),
    )
    .await;
    assert!(gateway.state().store.snapshot(&"abc".into()).await.is_some());

    let request = Request::builder()
        .method("DELETE")
        .uri("/sessions/abc")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reset"], true);
    assert!(gateway.state().store.snapshot(&"abc".into()).await.is_none());
}

#[tokio::test]
async fn test_status_reports_sessions_and_canteens() {
    let (_, router) = gateway_with(GatewayConfig::default(), Arc::new(StubFetcher::default()));
    send(&router, post_turn(json!({"session_id": "one", "intent": "greet"}))).await;

    let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 1);
    assert_eq!(
        body["canteens"],
        json!(["Hardenbergstrasse", "Marchstrasse", "Vegan Mensa"])
    );
}
