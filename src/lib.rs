pub mod config;
pub mod emotion;
pub mod encoder;
pub mod enroll;
pub mod error;
pub mod matcher;
pub mod probe;
pub mod service;
pub mod store;

pub use error::{Error, Result};

// Re-export vision types for convenience
pub use facegate_vision::{Detection, Embedding, ModelPaths, Pipeline, EMBEDDING_DIM};
