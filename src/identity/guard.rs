//! Access guard for routes that need a signed-in caller.
//!
//! `authenticate` is the framework-independent decision; `require_authentication`
//! is the axum middleware that acts on it. A denied request is answered with a
//! redirect and the inner handler never runs.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/v1/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(auth_config, require_authentication));
//! ```

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tracing::{debug, error};

use super::context::{IdentityHandle, RequestContext};
use crate::config::AuthConfig;
use crate::error::AppError;

/// Result of the guard check. `Deny` tells the dispatcher to stop and redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Deny { location: String },
}

pub fn authenticate(ctx: &mut RequestContext, config: &AuthConfig) -> GuardOutcome {
    if ctx.is_signed_in() {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Deny { location: config.denied_redirect.clone() }
    }
}

/// Response sent when a guarded request has nobody signed in.
pub fn access_denied(location: &str) -> Response {
    Redirect::to(location).into_response()
}

pub async fn require_authentication(State(config): State<AuthConfig>, request: Request, next: Next) -> Response {
    let Some(handle) = request.extensions().get::<IdentityHandle>().cloned() else {
        error!(target: "identity", uri = %request.uri(), "guarded route reached without the identity layer");
        return AppError::internal("identity_layer_missing", "identity layer not installed").into_response();
    };
    match handle.with(|ctx| authenticate(ctx, &config)) {
        GuardOutcome::Allow => next.run(request).await,
        GuardOutcome::Deny { location } => {
            debug!(target: "identity", uri = %request.uri(), %location, "access denied");
            access_denied(&location)
        }
    }
}
