mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;
mod services;

use crate::rate_limit::RateLimitState;
use crate::state::AppState;
use axum::Router;

pub fn router(limiter: RateLimitState) -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes(limiter))
}
