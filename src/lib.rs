//! polyprompt: send one prompt to several LLM providers and compare the answers
//!
//! This library provides:
//! - Provider adapters translating one prompt into each provider's wire format
//! - A dispatcher that normalizes every outcome into a result record
//! - Concurrent fan-out over the selected models and summary synthesis
//! - A relay HTTP server and the CLI commands built on top

pub mod catalog;
pub mod config;
pub mod llm;
pub mod orchestration;
pub mod session;
pub mod storage;
pub mod transport;

pub use catalog::Catalog;
pub use config::Config;
pub use session::Session;
