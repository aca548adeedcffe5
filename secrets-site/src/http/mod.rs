//! HTTP layer: Axum router, session cookies, views and handlers.
//!
//! Public pages (`/`, `/register`, `/login`, `/logout`) and the gated pages
//! (`/secrets`, `/download`) that require a signed session cookie.

mod auth;
mod error;
mod flash;
mod handlers;
mod state;
mod views;


pub use handlers::router;
pub use state::{derive_cookie_key, AppState, SessionSettings};
