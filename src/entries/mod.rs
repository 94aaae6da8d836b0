mod dto;
pub mod handlers;
pub(crate) mod repo;
mod repo_types;
pub(crate) mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
