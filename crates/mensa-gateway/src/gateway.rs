//! Main Gateway implementation
//!
//! HTTP surface over the dialogue engine. Each request to `/turn` runs one
//! dialogue turn for the session named in the body, or for a new session
//! when none is given.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use mensa_core::{
    DialogueEngine, DialogueState, Entities, HttpMenuFetcher, MenuFetcher, Response, SessionId,
    SessionStore, TurnInput,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::{GatewayError, Result};

/// Body of `POST /turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// Omitted on the first turn of a conversation
    #[serde(default)]
    pub session_id: Option<String>,

    pub intent: String,

    #[serde(default)]
    pub entities: Entities,
}

/// Reply of `POST /turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub state: DialogueState,
    pub responses: Vec<Response>,
    /// Rendered text of each directive
    pub text: Vec<String>,
}

/// Gateway state shared across handlers
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub engine: Arc<DialogueEngine>,
    pub store: Arc<SessionStore>,
}

impl GatewayState {
    /// State backed by the configured HTTP provider
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let fetcher = HttpMenuFetcher::new(config.provider.base_url.clone(), config.provider.timeout())?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// State backed by an arbitrary fetcher
    pub fn with_fetcher(config: GatewayConfig, fetcher: Arc<dyn MenuFetcher>) -> Self {
        let engine = DialogueEngine::new(fetcher)
            .with_canteens(config.canteen_registry())
            .with_fetch_timeout(config.provider.timeout());

        Self {
            store: Arc::new(SessionStore::new(config.session.timeout_secs)),
            engine: Arc::new(engine),
            config,
        }
    }
}

/// Main Gateway
#[derive(Debug)]
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a new gateway with configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        Ok(Self::from_state(GatewayState::new(config)?))
    }

    pub fn from_state(state: GatewayState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Get gateway state
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/turn", post(Self::handle_turn))
            .route("/sessions/:id", delete(Self::handle_reset_session))
            .route("/health", get(Self::handle_health))
            .route("/status", get(Self::handle_status))
            .layer(CorsLayer::permissive());

        if self.state.config.tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router.with_state(self.state.clone())
    }

    /// Start the gateway server; returns after Ctrl+C
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.socket_addr()?;
        let router = self.build_router();
        let sweeper = self.spawn_session_sweeper();

        tracing::info!("Mensa Gateway starting on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()));

        sweeper.abort();
        tracing::info!("Gateway stopped");
        served
    }

    /// Periodically drop sessions idle past the session timeout
    pub fn spawn_session_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let store = self.state.store.clone();
        let every = Duration::from_secs(self.state.config.session.sweep_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired();
                if removed > 0 {
                    tracing::info!("Swept {} expired sessions", removed);
                }
            }
        })
    }

    // HTTP handlers

    async fn handle_turn(
        State(state): State<Arc<GatewayState>>,
        Json(request): Json<TurnRequest>,
    ) -> Result<Json<TurnResponse>> {
        if request.intent.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("intent must not be empty".to_string()));
        }

        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .map(SessionId::from)
            .unwrap_or_default();
        let input = TurnInput {
            intent: request.intent,
            entities: request.entities,
        };
        let today = chrono::Local::now().date_naive();

        let outcome = tokio::time::timeout(
            state.config.turn_timeout(),
            state.engine.process_turn(&state.store, &session_id, &input, today),
        )
        .await
        .map_err(|_| {
            tracing::warn!("Turn timed out for {}", session_id);
            GatewayError::TurnTimeout(state.config.turn_timeout_secs)
        })?;

        Ok(Json(TurnResponse {
            session_id: session_id.to_string(),
            state: outcome.state(),
            text: outcome.rendered(),
            responses: outcome.responses,
        }))
    }

    async fn handle_reset_session(
        State(state): State<Arc<GatewayState>>,
        Path(id): Path<String>,
    ) -> impl IntoResponse {
        let session_id = SessionId::from(id);
        let reset = state.store.reset(&session_id).await;

        Json(serde_json::json!({
            "session_id": session_id.to_string(),
            "reset": reset
        }))
    }

    async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "version": crate::VERSION
        }))
    }

    async fn handle_status(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
        Json(serde_json::json!({
            "version": crate::VERSION,
            "sessions": state.store.session_count(),
            "canteens": state.engine.canteens().display_names(),
            "provider": state.config.provider.base_url,
            "session_timeout_secs": state.store.timeout_secs()
        }))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Gateway shutdown initiated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_request_defaults() {
        let request: TurnRequest = serde_json::from_str(r#"{"intent": "greet"}"#).unwrap();
        assert!(request.session_id.is_none());
        assert_eq!(request.entities, Entities::default());
    }

    #[tokio::test]
    async fn test_state_uses_configured_canteens() {
        let config = GatewayConfig::default()
            .with_canteens(vec![mensa_core::Canteen::new("321", "Mensa Nord")]);
        let state = GatewayState::new(config).unwrap();
        assert_eq!(state.engine.canteens().display_names(), vec!["Mensa Nord"]);
        assert_eq!(state.store.timeout_secs(), 3600);
    }
}
