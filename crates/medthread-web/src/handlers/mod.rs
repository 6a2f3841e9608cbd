//! HTTP handlers for all web routes.

pub mod api;
pub mod home;
pub mod search;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

use crate::state::AppState;

/// Render an embedded template; a rendering failure is logged and becomes a bare 500.
pub(crate) fn render<S: Serialize>(state: &AppState, name: &str, ctx: S) -> Response {
    let rendered = state
        .templates
        .get_template(name)
        .and_then(|template| template.render(ctx));

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(template = name, error = %e, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}
