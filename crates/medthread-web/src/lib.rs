//! medthread-web — the request pipeline and its web surface.
//!   - Entry page with one search field
//!   - Result page: generated thread plus the articles it was built from
//!   - JSON API for the same pipeline

pub mod handlers;
pub mod pipeline;
pub mod router;
pub mod state;
