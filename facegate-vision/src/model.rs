use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

pub const DETECTOR_FILE: &str = "face_detection.onnx";
pub const ENCODER_FILE: &str = "face_recognition.onnx";
pub const EMOTION_FILE: &str = "emotion_classification.onnx";

/// Where the ONNX models live on disk. Sessions are built from files rather
/// than embedded bytes so a missing model is a runtime capability gap, not a
/// build failure.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub encoder: PathBuf,
    pub emotion: PathBuf,
}

impl ModelPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            detector: dir.join(DETECTOR_FILE),
            encoder: dir.join(ENCODER_FILE),
            emotion: dir.join(EMOTION_FILE),
        }
    }

    /// Detector and encoder together make face recognition usable.
    pub fn recognition_available(&self) -> bool {
        self.detector.is_file() && self.encoder.is_file()
    }

    /// Emotion scoring needs the detector too, since it classifies the
    /// cropped face rather than the whole frame.
    pub fn emotion_available(&self) -> bool {
        self.detector.is_file() && self.emotion.is_file()
    }
}

pub fn session_builder() -> Result<SessionBuilder> {
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(ort::Error::<()>::from)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder);
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

pub fn session_from_file(path: &Path) -> Result<Session> {
    session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("loading model {}", path.display()))
}
