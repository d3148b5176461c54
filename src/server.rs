//!
//! brewhub HTTP server
//! -------------------
//! Axum-based HTTP surface around identity resolution.
//!
//! Responsibilities:
//! - Cookie-keyed in-memory sessions, loaded before and persisted after each request.
//! - Building the per-request `RequestContext` (session, parameters, intent) and
//!   exposing it to handlers through request extensions.
//! - Sign in with a private token, sign out, and a guarded "who am I" endpoint.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRef, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use anyhow::Context;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{AuthConfig, ServerConfig};
use crate::error::{AppError, AppResult};
use crate::identity::{
    require_authentication, AccountStore, CurrentAccount, IdentityHandle, MemoryAccountStore, RequestContext,
    RequestIntent, RequestParams, Session,
};

/// Largest request body scanned for a `token` parameter.
const MAX_PARAM_BODY: usize = 64 * 1024;

/// Session id -> session values. Sessions live only as long as the process.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self { Self::default() }

    pub async fn load(&self, sid: &str) -> Option<Session> {
        self.inner.read().await.get(sid).cloned()
    }

    pub async fn save(&self, sid: &str, mut session: Session) {
        session.mark_clean();
        self.inner.write().await.insert(sid.to_string(), session);
    }

    pub async fn remove(&self, sid: &str) -> bool {
        self.inner.write().await.remove(sid).is_some()
    }

    pub async fn len(&self) -> usize { self.inner.read().await.len() }
}

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: SessionStore,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(accounts: Arc<dyn AccountStore>, auth: AuthConfig) -> Self {
        Self { accounts, sessions: SessionStore::new(), auth }
    }
}

impl FromRef<AppState> for AuthConfig {
    fn from_ref(state: &AppState) -> Self { state.auth.clone() }
}

/// Full application router.
pub fn router(state: AppState) -> Router {
    identity_stack(api_routes(&state), state)
}

/// Application routes without the identity layer. Guarded routes carry
/// `require_authentication` as a route layer.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/api/v1/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.auth.clone(), require_authentication));

    Router::new()
        .route("/", get(|| async { "brewhub ok" }))
        .route("/session", post(sign_in).delete(sign_out))
        .merge(guarded)
}

/// Wrap routes with the identity layer and bind the state.
pub fn identity_stack(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(middleware::from_fn_with_state(state.clone(), identity_layer))
        .with_state(state)
}

/// Start the HTTP server and serve until the listener fails.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let accounts = match &config.seed_file {
        Some(path) => MemoryAccountStore::load_json(path)?,
        None => MemoryAccountStore::new(),
    };
    info!(target: "startup", accounts = accounts.len(), seed = ?config.seed_file, "account store ready");
    if accounts.is_empty() {
        warn!(target: "startup", "no accounts loaded; every guarded request will be denied");
    }

    let state = AppState::new(Arc::new(accounts), config.auth.clone());
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE) {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

fn set_session_cookie(name: &str, sid: &str) -> AppResult<HeaderValue> {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", name, sid))
        .map_err(|e| AppError::internal("cookie_error", e.to_string()))
}

fn clear_session_cookie(name: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!("{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/", name))
        .map_err(|e| AppError::internal("cookie_error", e.to_string()))
}

fn new_session_id() -> AppResult<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| AppError::internal("session_id", e.to_string()))?;
    let mut sid = String::with_capacity(32);
    use std::fmt::Write as _;
    for b in &bytes { let _ = write!(&mut sid, "{:02x}", b); }
    Ok(sid)
}

enum BodyKind { Form, Json }

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let ct = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/x-www-form-urlencoded" => Some(BodyKind::Form),
        "application/json" => Some(BodyKind::Json),
        _ => None,
    }
}

/// Collect request parameters from the query and a form/JSON body. The body is
/// buffered and put back so handlers can still extract it.
async fn extract_params(request: Request) -> AppResult<(Request, RequestParams)> {
    let mut params = RequestParams::from_query(request.uri().query());
    let Some(kind) = body_kind(request.headers()) else { return Ok((request, params)); };
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_PARAM_BODY)
        .await
        .map_err(|e| AppError::user("body_unreadable", e.to_string()))?;
    match kind {
        BodyKind::Form => params.merge_form(&String::from_utf8_lossy(&bytes)),
        BodyKind::Json => params.merge_json(&bytes),
    }
    Ok((Request::from_parts(parts, Body::from(bytes)), params))
}

async fn identity_layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match run_identity_layer(state, request, next).await {
        Ok(resp) => resp,
        Err(e) => e.into_response(),
    }
}

async fn run_identity_layer(state: AppState, request: Request, next: Next) -> AppResult<Response> {
    // only ids this server issued are honoured; an unknown cookie means no session
    let mut sid = None;
    let mut session = Session::new();
    if let Some(s) = parse_cookie(request.headers(), &state.auth.session_cookie) {
        match state.sessions.load(&s).await {
            Some(loaded) => { session = loaded; sid = Some(s); }
            None => debug!(target: "session", "ignoring unknown session id"),
        }
    }
    let signed_in_as = session.identity_reference();
    let intent = RequestIntent::from_method(request.method());
    let (mut request, params) = extract_params(request).await?;

    let handle = IdentityHandle::new(RequestContext::new(state.accounts.clone(), session, params, intent));
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    let session = handle.session_snapshot();
    if !session.is_dirty() {
        return Ok(response);
    }
    let cookie = &state.auth.session_cookie;
    if session.is_empty() {
        if let Some(s) = &sid {
            state.sessions.remove(s).await;
            debug!(target: "session", "session dropped");
        }
        response.headers_mut().append(SET_COOKIE, clear_session_cookie(cookie)?);
        return Ok(response);
    }
    match sid {
        Some(s) if session.identity_reference() == signed_in_as => {
            state.sessions.save(&s, session).await;
        }
        old => {
            // new session, or the signed-in account changed: always move to a fresh id
            let fresh = new_session_id()?;
            if let Some(old) = old {
                state.sessions.remove(&old).await;
                debug!(target: "session", "session id rotated");
            } else {
                debug!(target: "session", "session created");
            }
            state.sessions.save(&fresh, session).await;
            response.headers_mut().append(SET_COOKIE, set_session_cookie(cookie, &fresh)?);
        }
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct SignInPayload { token: String }

async fn sign_in(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityHandle>,
    Json(payload): Json<SignInPayload>,
) -> AppResult<impl IntoResponse> {
    if payload.token.is_empty() {
        return Err(AppError::user("missing_token", "token is required"));
    }
    let Some(account) = state.accounts.find_by_private_token(&payload.token) else {
        return Err(AppError::auth("invalid_token", "token does not identify an account"));
    };
    identity.set_current_identity(Some(account.clone()));
    Ok((StatusCode::OK, Json(serde_json::json!({"status": "ok", "account": account}))))
}

async fn sign_out(Extension(identity): Extension<IdentityHandle>) -> impl IntoResponse {
    identity.set_current_identity(None);
    Json(serde_json::json!({"status": "ok"}))
}

async fn me(CurrentAccount(account): CurrentAccount) -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "account": account}))
}
