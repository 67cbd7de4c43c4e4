#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{liveness::live, read::read_answer, readiness::ready, setup::setup_index};

pub mod api_state;
pub mod error;
mod routes;

/// Router for the setup and read API plus probes.
pub fn api_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/setup", post(setup_index))
        .route("/read", post(read_answer))
        .route("/ready", get(ready))
        .route("/live", get(live))
}
