//! HTTP layer: Axum router, session cookie, guards and JSON page views.
//!
//! Pages render as JSON view models. Successful form posts answer with
//! `303 See Other`; failed ones re-render the form as `{"error", "form"}`.

mod error;
mod guard;
mod handlers;
mod responses;
mod session;
mod state;

#[cfg(test)]
mod tests;

pub use handlers::router;
pub use session::signing_key;
pub use state::AppState;
