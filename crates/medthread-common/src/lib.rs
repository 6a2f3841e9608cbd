//! medthread-common — Shared error type, the sandboxed HTTP client used by
//! every outbound call, and the types more than one crate needs.

pub mod error;
pub mod sandbox;
pub mod selection;

pub use error::MedthreadError;
pub use sandbox::SandboxClient;
pub use selection::SelectionMode;
