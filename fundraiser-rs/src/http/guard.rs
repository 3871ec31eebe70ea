//! Authorization guards.
//!
//! Every mutating or admin-only handler takes exactly one of [`CurrentUser`] or
//! [`AdminUser`]. Both resolve the session on each request; the handler body is
//! unreachable unless the guard succeeds. Form bodies are extracted after the
//! guard, so unauthenticated requests never reach validation.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::warn;

use crate::error::AppError;
use crate::identity::{resolve_optional, resolve_required, Viewer};
use crate::models::User;

use super::error::ApiError;
use super::session::Session;
use super::state::AppState;

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// A signed-in user with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

async fn session(parts: &mut Parts, state: &AppState) -> Session {
    match Session::from_request_parts(parts, state).await {
        Ok(session) => session,
        Err(never) => match never {},
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session(parts, state).await;
        match resolve_required(&state.store, &session).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(err) => {
                warn!(path = %parts.uri.path(), "unauthenticated request");
                Err(err.into())
            }
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_admin(user)
            .map(AdminUser)
            .map_err(|err| {
                warn!(path = %parts.uri.path(), "admin access denied");
                err.into()
            })
    }
}

pub fn require_admin(user: User) -> Result<User, AppError> {
    if user.is_admin() {
        Ok(user)
    } else {
        Err(AppError::Forbidden("Admin access required"))
    }
}

/// Optional identity for public pages.
impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = session(parts, state).await;
        Ok(resolve_optional(&state.store, &session).await)
    }
}
