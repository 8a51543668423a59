/// API routes and handlers
pub mod ai;
pub mod auth;
pub mod health;
pub mod middleware;
pub mod notes;
pub mod response;

use crate::context::AppContext;
use axum::Router;

/// Build API routes, mounted under `/api`
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(notes::routes())
        .merge(ai::routes())
}
