//! HTTP surface over the two inbound operations: criteria evaluation and
//! access verification. Transport only; all decisions live in the library.

use crate::access::cache::AccessCache;
use crate::access::errors::AccessError;
use crate::access::types::{AccessRequest, Action, Router as AccessRouter};
use crate::access::verifier::AccessVerifier;
use crate::criteria::evaluator::CriteriaEvaluator;
use crate::criteria::matcher::PatternMatcher;
use crate::criteria::relay::HttpRelay;
use crate::criteria::types::CriteriaRequest;
use crate::errors::SwitcherError;
use crate::settings::Settings;
use crate::store::loader::load_snapshot;
use crate::store::{CriteriaStore, MemoryStore};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<MemoryStore>,
    pub evaluator: Arc<CriteriaEvaluator<MemoryStore>>,
    pub verifier: Arc<AccessVerifier<MemoryStore>>,
}

impl AppState {
    /// Wire store, cache, evaluator and verifier from settings, seeding the
    /// store from the snapshot directory when it exists.
    pub fn build(settings: Settings) -> Result<Self, SwitcherError> {
        let cache = Arc::new(AccessCache::new(settings.cache.enabled));
        let store = MemoryStore::new().with_invalidation(cache.clone());

        if settings.data.snapshot_dir.is_dir() {
            load_snapshot(&settings.data.snapshot_dir, &store)?;
        } else {
            tracing::warn!(
                dir = %settings.data.snapshot_dir.display(),
                "Snapshot directory not found, starting empty"
            );
        }
        let store = Arc::new(store);

        let relay = HttpRelay::new(Duration::from_millis(settings.relay.timeout_ms))?;
        let evaluator =
            CriteriaEvaluator::new(store.clone(), PatternMatcher::from_settings(&settings.matcher))
                .with_relay(Arc::new(relay));
        let verifier = AccessVerifier::new(store.clone()).with_cache(cache);

        Ok(Self {
            settings: Arc::new(settings),
            store,
            evaluator: Arc::new(evaluator),
            verifier: Arc::new(verifier),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub actor: String,
    pub domain: String,
    pub actions: Vec<Action>,
    pub router: AccessRouter,
    #[serde(default)]
    pub cascade: bool,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    pub elements: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub elements: Vec<Value>,
}

async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store"),
    );
    response
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/criteria/{key}", post(handle_criteria))
        .route("/v1/verify", post(handle_verify))
        .route("/healthz", get(health))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

pub async fn serve(state: AppState) -> miette::Result<()> {
    let addr: SocketAddr = state.settings.bind_addr().parse().into_diagnostic()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "Switcher API listening");
    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}

async fn handle_criteria(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<CriteriaRequest>,
) -> impl IntoResponse {
    match state.evaluator.evaluate(&key, &req).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn handle_verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> impl IntoResponse {
    match verify(&state, req).await {
        Ok(elements) => Json(VerifyResponse { elements }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn verify(state: &AppState, req: VerifyRequest) -> Result<Vec<Value>, AccessError> {
    let domain = state
        .store
        .find_domain_by_id(&req.domain)
        .await?
        .ok_or_else(|| AccessError::NotFound {
            entity: "domain",
            id: req.domain.clone(),
        })?;
    let Some(first) = req.actions.first().copied() else {
        return Err(AccessError::BadRequest("at least one action is required".into()));
    };

    let access = AccessRequest::new(&req.actor, &domain, first, req.router)
        .actions(&req.actions)
        .cascade(req.cascade)
        .environment(req.environment.as_deref())
        .parent(req.parent.as_deref());
    state.verifier.verify_many_cached(&access, req.elements).await
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
