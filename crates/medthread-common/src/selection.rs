use serde::{Deserialize, Serialize};

/// How many of the located article ids a request goes on to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Every id the search returned, in API order (bounded by `max_results`).
    #[default]
    All,
    /// A single id picked uniformly at random from the search results.
    RandomOne,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::All       => "all",
            SelectionMode::RandomOne => "random_one",
        }
    }
}
