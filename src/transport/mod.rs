//! Transport layer: terminal commands and the relay HTTP server

pub mod cli;
pub mod http;
