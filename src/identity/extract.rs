use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use super::account::Account;
use super::context::IdentityHandle;
use super::guard::access_denied;
use crate::config::AuthConfig;
use crate::error::AppError;

/// Handler argument for the signed-in account. Without one the request is answered
/// with the same redirect the access guard uses.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

/// Handler argument for an optional signed-in account.
#[derive(Debug, Clone)]
pub struct MaybeAccount(pub Option<Account>);

fn handle_from(parts: &Parts) -> Result<IdentityHandle, Response> {
    parts
        .extensions
        .get::<IdentityHandle>()
        .cloned()
        .ok_or_else(|| AppError::internal("identity_layer_missing", "identity layer not installed").into_response())
}

impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
    AuthConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let handle = handle_from(parts)?;
        match handle.current_identity() {
            Some(account) => Ok(CurrentAccount(account)),
            None => Err(access_denied(&AuthConfig::from_ref(state).denied_redirect)),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeAccount
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let handle = handle_from(parts)?;
        Ok(MaybeAccount(handle.current_identity()))
    }
}
