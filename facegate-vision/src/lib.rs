pub mod detect;
pub mod emotion;
pub mod encode;
pub mod model;
pub mod pipeline;

// Re-export commonly used types
pub use detect::Detection;
pub use emotion::{EmotionScores, EMOTION_LABELS};
pub use encode::{Embedding, EMBEDDING_DIM};
pub use model::ModelPaths;
pub use pipeline::{EmotionNet, Pipeline};
