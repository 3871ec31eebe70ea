use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::password::CredentialHasher;
use crate::store::Store;

/// Shared handler state. Everything in here is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub hasher: CredentialHasher,
    pub cookie_key: Key,
    pub cookie_secure: bool,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
