//! Shared application state for the web server.

use std::sync::Arc;

use minijinja::Environment;

use crate::pipeline::ThreadPipeline;

/// Read-only state injected into every Axum handler.
pub struct AppState {
    pub pipeline: ThreadPipeline,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(pipeline: ThreadPipeline) -> anyhow::Result<Self> {
        Ok(Self { pipeline, templates: templates()? })
    }
}

/// Templates are compiled into the binary; `.html` names get auto-escaping.
fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("base.html", include_str!("../templates/base.html"))?;
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    env.add_template("result.html", include_str!("../templates/result.html"))?;
    Ok(env)
}

pub type SharedState = Arc<AppState>;
