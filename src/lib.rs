//! ytm-enrich library - resolution and metadata enrichment pipeline shared
//! by the CLI and the integration tests.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod cover;
pub mod error;
pub mod http;
pub mod media;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod spotify;
pub mod tagging;
