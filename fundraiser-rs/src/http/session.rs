//! Cookie-backed session: one signed cookie carrying the user id.
//!
//! The cookie is signed, not encrypted. A missing, unsigned or tampered
//! cookie reads as "no session".

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponseParts, ResponseParts};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::prelude::*;
use thiserror::Error;
use tracing::warn;

use crate::identity::SessionSource;
use crate::models::UserId;

use super::state::AppState;

pub const SESSION_COOKIE: &str = "session";
const KEY_MIN_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum SessionKeyError {
    #[error("session secret is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("session secret decodes to {len} bytes; at least 64 are required")]
    TooShort { len: usize },
}

/// Builds the cookie signing key. Without a configured secret a random key is
/// generated and sessions do not survive a restart.
pub fn signing_key(secret: Option<&str>) -> Result<Key, SessionKeyError> {
    let Some(secret) = secret else {
        warn!("no session secret configured; using an ephemeral signing key");
        return Ok(Key::generate());
    };
    let bytes = BASE64_STANDARD.decode(secret.trim())?;
    if bytes.len() < KEY_MIN_LEN {
        return Err(SessionKeyError::TooShort { len: bytes.len() });
    }
    Key::try_from(bytes.as_slice()).map_err(|_| SessionKeyError::TooShort { len: bytes.len() })
}

/// Per-request session handle. Handlers that change the session return it as
/// part of their response so the cookie update is sent.
pub struct Session {
    jar: SignedCookieJar,
    secure: bool,
}

impl Session {
    pub fn sign_in(self, user_id: UserId) -> Self {
        let cookie = Cookie::build((SESSION_COOKIE, user_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);
        Self {
            jar: self.jar.add(cookie),
            secure: self.secure,
        }
    }

    pub fn clear(self) -> Self {
        Self {
            jar: self.jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
            secure: self.secure,
        }
    }
}

impl SessionSource for Session {
    fn user_id(&self) -> Option<UserId> {
        self.jar.get(SESSION_COOKIE)?.value().parse().ok()
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_request_parts(parts, state).await?;
        Ok(Self {
            jar,
            secure: state.cookie_secure,
        })
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.jar.into_response_parts(res)
    }
}
