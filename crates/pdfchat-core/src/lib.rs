pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod state;

// Re-export main types for convenience
pub use client::{Backend, BackendClient, QueryRequest, QueryResponse};
pub use config::Config;
pub use error::BackendError;
pub use models::{ModelProvider, EMBEDDING_MODELS, GENERATION_MODELS};
pub use pipeline::{ask, build_index, IndexBuildOutcome};
pub use state::{
    BuildRequest, ChatTurn, ConfigUpdate, Configuration, ConsoleState, IndexBuildState,
    NumericField, SelectedFile,
};
