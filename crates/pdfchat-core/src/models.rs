//! Fixed model catalogs offered by the console.
//!
//! The backend routes generation models to a provider by name, so the picker
//! shows that provider next to each entry.

/// Generation models the backend accepts for `/process` and `/query`.
pub const GENERATION_MODELS: &[&str] = &[
    "llama-3.2-90b-text-preview",
    "liquid/lfm-40b:free",
    "nousresearch/hermes-3-llama-3.1-405b:free",
    "meta-llama/llama-3.1-405b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
    "llama-3.1-70b-versatile",
    "mixtral-8x7b-32768",
    "llama-3.2-3b-preview",
    "gpt-4o",
    "gpt-4o-mini",
    "Phi-3.5-MoE-instruct",
    "Mistral-large",
];

/// Embedding models the backend can index with.
pub const EMBEDDING_MODELS: &[&str] = &[
    "BAAI/bge-small-en",
    "sentence-transformers/all-mpnet-base-v2",
    "text-embedding-3-large",
    "text-embedding-3-small",
];

pub const DEFAULT_MODEL: &str = "llama-3.2-90b-text-preview";
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-small-en";

const OPENROUTER_MODELS: &[&str] = &[
    "liquid/lfm-40b:free",
    "nousresearch/hermes-3-llama-3.1-405b:free",
    "meta-llama/llama-3.1-405b-instruct:free",
    "mistralai/mistral-7b-instruct:free",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Groq,
    OpenRouter,
    HuggingFace,
    Unrouted,
}

impl ModelProvider {
    /// Provider the backend hands a generation model to.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("llama-") || model.starts_with("mixtral-") {
            ModelProvider::Groq
        } else if OPENROUTER_MODELS.contains(&model) {
            ModelProvider::OpenRouter
        } else if model == "gpt-4o" || model == "gpt-4o-mini" {
            ModelProvider::HuggingFace
        } else {
            ModelProvider::Unrouted
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelProvider::Groq => "Groq",
            ModelProvider::OpenRouter => "OpenRouter",
            ModelProvider::HuggingFace => "Hugging Face",
            ModelProvider::Unrouted => "unrouted",
        }
    }
}

pub fn is_generation_model(model: &str) -> bool {
    GENERATION_MODELS.contains(&model)
}

pub fn is_embedding_model(model: &str) -> bool {
    EMBEDDING_MODELS.contains(&model)
}
