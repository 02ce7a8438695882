use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Zero faces found across all submitted images for an operation.
    #[error("no face detected; ensure the face is visible and well-lit")]
    NoFaceDetected,

    /// Matching attempted before any identity has enrolled.
    #[error("no encodings available")]
    NoEncodingsAvailable,

    /// Recognition models are missing, so enrollment and matching are off.
    #[error("face recognition unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("invalid identity key {0:?}")]
    InvalidIdentity(String),

    #[error("invalid probe image: {0}")]
    InvalidProbe(String),

    #[error("reading {path}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt encoding record at {path}: {message}")]
    CorruptRecord { path: PathBuf, message: String },

    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Failure inside the vision pipeline (detector, encoder, or classifier).
    #[error("face pipeline failure")]
    Pipeline(#[source] anyhow::Error),
}
