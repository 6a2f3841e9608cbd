//! Form submission: run the pipeline and render either the thread or the
//! entry page with a message. Pipeline outcomes are always HTTP 200.

use axum::{extract::State, response::Response, Form};
use minijinja::context;
use serde::Deserialize;

use crate::handlers::render;
use crate::pipeline::PipelineOutcome;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub query: String,
}

pub async fn search_submit(
    State(state): State<SharedState>,
    Form(form): Form<SearchForm>,
) -> Response {
    match state.pipeline.run(&form.query).await {
        PipelineOutcome::Completed(report) => render(&state, "result.html", context! { report => report }),
        PipelineOutcome::Rejected(reason) => render(
            &state,
            "index.html",
            context! { query => form.query, error => reason.to_string() },
        ),
    }
}
