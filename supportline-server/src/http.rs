//! Supportline HTTP API
//!
//! Axum server carrying the widget dispatch endpoint and the agent console
//! routes. Each endpoint has a thin axum handler that delegates to an inner
//! function returning `(StatusCode, Value)`; the inner functions are what the
//! unit tests call.
//!
//! Endpoints:
//! - GET  /health                              — store health
//! - GET  /version                             — server version info
//! - POST /api/widget                          — widget request dispatcher
//! - GET  /api/agents                          — list agent profiles
//! - POST /api/agents                          — check-or-create agent profile
//! - PATCH /api/agents/:user                   — edit a profile
//! - GET|PUT /api/canned-messages/:scope       — personal or default canned messages
//! - GET  /api/agent-candidates               — users without an agent profile
//! - PUT  /api/users/:id                       — upsert a user account
//! - GET  /api/sessions, /api/sessions/:id     — session list (filterable) / detail
//! - PUT  /api/sessions/:id/resolved           — resolve or reopen
//! - PUT  /api/sessions/:id/tags               — replace tags (catalog names only)
//! - GET|POST /api/tags, DELETE /api/tags/:name — tag catalog
//! - GET  /api/client-details/:id              — visitor details
//! - GET|PUT /api/widget-settings              — widget settings singleton
//!
//! The acting identity is read from the `X-Supportline-User` header and
//! defaults to `Guest`. Malformed JSON bodies and query strings get the same
//! `{"error", "status"}` body as every other failure.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::QueryRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post, put};
use axum::{async_trait, Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use supportline_core::models::{
    AgentProfileUpdate, CannedMessage, CannedScope, SessionFilter, UserAccount, WidgetSettings,
    GUEST,
};
use supportline_core::{SupportError, WidgetRequest};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::context::AppContext;
use crate::subsystems::{agents, clients, sessions, tags, widget};

pub const ACTOR_HEADER: &str = "x-supportline-user";

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/widget", post(widget_handler))
        .route(
            "/api/agents",
            get(list_agents_handler).post(check_agent_handler),
        )
        .route("/api/agents/:user", patch(update_agent_handler))
        .route(
            "/api/canned-messages/:scope",
            get(get_canned_handler).put(put_canned_handler),
        )
        .route("/api/agent-candidates", get(users_without_profile_handler))
        .route("/api/users/:id", put(upsert_user_handler))
        .route("/api/sessions", get(list_sessions_handler))
        .route("/api/sessions/:id", get(get_session_handler))
        .route("/api/sessions/:id/resolved", put(set_resolved_handler))
        .route("/api/sessions/:id/tags", put(set_tags_handler))
        .route("/api/tags", get(list_tags_handler).post(create_tag_handler))
        .route("/api/tags/:name", delete(delete_tag_handler))
        .route("/api/client-details/:id", get(client_details_handler))
        .route(
            "/api/widget-settings",
            get(get_widget_settings_handler).put(put_widget_settings_handler),
        )
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(ctx: AppContext, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = format!("{}:{}", ctx.config.http.host, ctx.config.http.port);
    let app = build_router(Arc::new(ctx));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Supportline HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CheckAgentRequest {
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CannedMessagesRequest {
    pub hot_word_and_messages: Vec<CannedMessage>,
}

#[derive(Debug, Deserialize)]
pub struct UserAccountRequest {
    pub full_name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ResolvedRequest {
    pub resolved: bool,
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Query string for `GET /api/sessions`. `mine=true` narrows to sessions
/// assigned to the caller and wins over `assignee`.
#[derive(Debug, Deserialize, Default)]
pub struct SessionListQuery {
    #[serde(default)]
    pub resolved: Option<bool>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub mine: bool,
    #[serde(default)]
    pub include_empty: bool,
}

impl SessionListQuery {
    pub fn into_filter(self, actor: &str) -> SessionFilter {
        SessionFilter {
            resolved: self.resolved,
            assignee: if self.mine {
                Some(actor.to_string())
            } else {
                self.assignee
            },
            include_empty: self.include_empty,
        }
    }
}

/// `Json` extractor whose rejection uses the API error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let (status, body) = error_reply(rejection.status(), rejection.body_text());
                Err((status, Json(body)))
            }
        }
    }
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub async fn health_inner(ctx: &AppContext) -> (StatusCode, serde_json::Value) {
    match ctx.store.health().await {
        Ok(store) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": store,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "supportline/1",
    })
}

/// Decode a raw widget payload and dispatch it.
pub async fn widget_inner(
    ctx: &AppContext,
    actor: &str,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request: WidgetRequest = match serde_json::from_value(payload) {
        Ok(r) => r,
        Err(e) => {
            return error_reply(StatusCode::BAD_REQUEST, format!("invalid widget request: {}", e));
        }
    };

    let result = crate::router::handle_request(request, ctx, actor).await;
    reply(result)
}

pub async fn check_agent_inner(
    ctx: &AppContext,
    actor: &str,
    req: CheckAgentRequest,
) -> (StatusCode, serde_json::Value) {
    let user = req.user.unwrap_or_else(|| actor.to_string());
    reply(agents::check_or_create(ctx, &user).await)
}

pub async fn get_canned_inner(
    ctx: &AppContext,
    actor: &str,
    scope: &str,
) -> (StatusCode, serde_json::Value) {
    let scope: CannedScope = match scope.parse() {
        Ok(s) => s,
        Err(e) => return failure(e),
    };
    reply(agents::canned_messages(ctx, scope, actor).await)
}

/// Replace canned messages. Failures are logged and reported in the body
/// as `{error, details}` rather than as an HTTP error.
pub async fn put_canned_inner(
    ctx: &AppContext,
    actor: &str,
    scope: &str,
    req: CannedMessagesRequest,
) -> (StatusCode, serde_json::Value) {
    let result = match scope.parse::<CannedScope>() {
        Ok(scope) => agents::replace_canned_messages(ctx, scope, actor, req.hot_word_and_messages).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => (StatusCode::OK, serde_json::json!(supportline_core::protocol::SUCCESS)),
        Err(e) => {
            tracing::error!("Error adding canned messages: {}", e);
            (
                StatusCode::OK,
                serde_json::json!({
                    "error": "Failed to add canned messages",
                    "details": e.to_string(),
                }),
            )
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<AppContext>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn widget_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<serde_json::Value>,
) -> impl IntoResponse {
    let (status, body) = widget_inner(&state, &actor_from(&headers), payload).await;
    (status, Json(body))
}

pub async fn check_agent_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<CheckAgentRequest>,
) -> impl IntoResponse {
    let (status, body) = check_agent_inner(&state, &actor_from(&headers), req).await;
    (status, Json(body))
}

pub async fn list_agents_handler(State(state): State<Arc<AppContext>>) -> impl IntoResponse {
    let (status, body) = reply(agents::list_agents(&state).await);
    (status, Json(body))
}

pub async fn update_agent_handler(
    State(state): State<Arc<AppContext>>,
    Path(user): Path<String>,
    ApiJson(update): ApiJson<AgentProfileUpdate>,
) -> impl IntoResponse {
    let (status, body) = reply(agents::update_profile(&state, &user, update).await);
    (status, Json(body))
}

pub async fn get_canned_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(scope): Path<String>,
) -> impl IntoResponse {
    let (status, body) = get_canned_inner(&state, &actor_from(&headers), &scope).await;
    (status, Json(body))
}

pub async fn put_canned_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(scope): Path<String>,
    ApiJson(req): ApiJson<CannedMessagesRequest>,
) -> impl IntoResponse {
    let (status, body) = put_canned_inner(&state, &actor_from(&headers), &scope, req).await;
    (status, Json(body))
}

pub async fn users_without_profile_handler(
    State(state): State<Arc<AppContext>>,
) -> impl IntoResponse {
    let (status, body) = reply(agents::users_without_profile(&state).await);
    (status, Json(body))
}

pub async fn upsert_user_handler(
    State(state): State<Arc<AppContext>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UserAccountRequest>,
) -> impl IntoResponse {
    let account = UserAccount {
        id,
        full_name: req.full_name,
        enabled: req.enabled,
    };
    let (status, body) = reply(agents::upsert_user(&state, account).await);
    (status, Json(body))
}

pub async fn list_sessions_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    query: std::result::Result<Query<SessionListQuery>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(query)) => {
            let filter = query.into_filter(&actor_from(&headers));
            reply(sessions::list_sessions(&state, &filter).await)
        }
        Err(rejection) => error_reply(rejection.status(), rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn get_session_handler(
    State(state): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = reply(sessions::load_session(&state, &id).await);
    (status, Json(body))
}

pub async fn set_resolved_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ResolvedRequest>,
) -> impl IntoResponse {
    let result = sessions::set_resolved(&state, &id, req.resolved, &actor_from(&headers)).await;
    let (status, body) = reply(result);
    (status, Json(body))
}

pub async fn set_tags_handler(
    State(state): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TagsRequest>,
) -> impl IntoResponse {
    let result = sessions::set_tags(&state, &id, req.tags, &actor_from(&headers)).await;
    let (status, body) = reply(result);
    (status, Json(body))
}

pub async fn list_tags_handler(State(state): State<Arc<AppContext>>) -> impl IntoResponse {
    let (status, body) = reply(tags::list_tags(&state).await);
    (status, Json(body))
}

pub async fn create_tag_handler(
    State(state): State<Arc<AppContext>>,
    ApiJson(req): ApiJson<CreateTagRequest>,
) -> impl IntoResponse {
    let (status, body) = reply(tags::create_tag(&state, &req.name, req.description).await);
    (status, Json(body))
}

pub async fn delete_tag_handler(
    State(state): State<Arc<AppContext>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let result = tags::delete_tag(&state, &name)
        .await
        .map(|()| supportline_core::protocol::SUCCESS);
    let (status, body) = reply(result);
    (status, Json(body))
}

pub async fn client_details_handler(
    State(state): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = reply(clients::load_client(&state, &id).await);
    (status, Json(body))
}

pub async fn get_widget_settings_handler(
    State(state): State<Arc<AppContext>>,
) -> impl IntoResponse {
    let (status, body) = reply(widget::widget_config(&state).await);
    (status, Json(body))
}

pub async fn put_widget_settings_handler(
    State(state): State<Arc<AppContext>>,
    ApiJson(settings): ApiJson<WidgetSettings>,
) -> impl IntoResponse {
    let (status, body) = reply(widget::update_widget_settings(&state, settings).await);
    (status, Json(body))
}

// ============================================================================
// Helpers
// ============================================================================

pub fn actor_from(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(GUEST)
        .to_string()
}

/// HTTP status for an error that escaped a handler.
pub fn error_status(e: &SupportError) -> StatusCode {
    match e {
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        SupportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T: Serialize>(result: std::result::Result<T, SupportError>) -> (StatusCode, serde_json::Value) {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        Err(e) => failure(e),
    }
}

fn failure(e: SupportError) -> (StatusCode, serde_json::Value) {
    let status = error_status(&e);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", e);
    }
    error_reply(status, e.to_string())
}

fn error_reply(status: StatusCode, msg: String) -> (StatusCode, serde_json::Value) {
    let body = serde_json::to_value(ErrorResponse::new(msg))
        .unwrap_or_else(|_| serde_json::json!({ "status": "error" }));
    (status, body)
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
