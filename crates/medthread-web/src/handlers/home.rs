//! Entry page and liveness probe.

use axum::{extract::State, response::Response};
use minijinja::context;

use crate::handlers::render;
use crate::state::SharedState;

pub async fn home(State(state): State<SharedState>) -> Response {
    render(&state, "index.html", context! { query => "" })
}

pub async fn health() -> &'static str {
    "ok"
}
