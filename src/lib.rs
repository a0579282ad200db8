//! Voice/Text Financial-Query Assistant
//!
//! A market Q&A service that:
//! - Extracts financial entities (tickers, sectors, regions) from a
//!   free-text query via a language model
//! - Fans out to market-data and news lookups for whatever was found
//! - Synthesizes a confident narrative answer from query + entities + data
//! - Optionally renders the answer as speech
//!
//! PIPELINE:
//! RECEIVE → EXTRACT → FETCH FAN-OUT → NEWS → SYNTHESIZE → SPEECH

pub mod api;
pub mod error;
pub mod extractor;
pub mod gemini;
pub mod market;
pub mod models;
pub mod news;
pub mod orchestrator;
pub mod synthesizer;
pub mod voice;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use orchestrator::Orchestrator;
