//! Identity resolution: session -> user.
//!
//! A session only ever carries a user id. Resolution looks the id up on every
//! request; nothing is cached between requests.

use tracing::debug;

use crate::error::AppError;
use crate::models::{User, UserId};
use crate::store::Store;

/// Read access to the per-request session.
pub trait SessionSource {
    fn user_id(&self) -> Option<UserId>;
}

/// Who is making the request.
#[derive(Debug, Clone)]
pub enum Viewer {
    Authenticated(User),
    Anonymous,
}

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        match self {
            Viewer::Authenticated(user) => Some(user),
            Viewer::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user().is_some_and(User::is_admin)
    }
}

/// Returns `None` without touching the store when the session has no user id,
/// and `None` when the id no longer names a user.
pub async fn resolve(store: &Store, session: &impl SessionSource) -> Option<User> {
    let user_id = session.user_id()?;
    let user = store.read(|tables| tables.user(user_id).cloned()).await;
    if user.is_none() {
        debug!(user_id, "session refers to unknown user");
    }
    user
}

pub async fn resolve_required(store: &Store, session: &impl SessionSource) -> Result<User, AppError> {
    resolve(store, session)
        .await
        .ok_or(AppError::Unauthenticated("Not authenticated"))
}

pub async fn resolve_optional(store: &Store, session: &impl SessionSource) -> Viewer {
    match resolve(store, session).await {
        Some(user) => Viewer::Authenticated(user),
        None => Viewer::Anonymous,
    }
}
