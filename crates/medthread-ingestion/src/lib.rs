//! medthread-ingestion — Literature side of the thread pipeline:
//! - Query translation (free text → English search term)
//! - Article location (PubMed esearch, time-bounded)
//! - Article resolution (PubMed efetch XML → article records)

pub mod models;
pub mod sources;
pub mod translate;
