use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;

use crate::detect::{self, Detection};
use crate::emotion::{self, EmotionScores};
use crate::encode::{self, Embedding};
use crate::model::{self, ModelPaths};

const DETECT_SCORE_THRESHOLD: f32 = 0.7;
const NMS_IOU_THRESHOLD: f32 = 0.3;
const CROP_MARGIN: f32 = 0.1;

/// Detect → crop → encode pipeline over the detector and encoder sessions.
pub struct Pipeline {
    detector: Session,
    encoder: Session,
}

impl Pipeline {
    pub fn open(paths: &ModelPaths) -> Result<Self> {
        Ok(Self {
            detector: model::session_from_file(&paths.detector)
                .context("initializing face detector")?,
            encoder: model::session_from_file(&paths.encoder)
                .context("initializing face encoder")?,
        })
    }

    /// Best-scoring face in the image, if any.
    pub fn detect_best(&mut self, img: &DynamicImage) -> Result<Option<Detection>> {
        let detections = detect::detect_faces(
            &mut self.detector,
            img,
            DETECT_SCORE_THRESHOLD,
            NMS_IOU_THRESHOLD,
        )
        .context("detecting faces")?;
        Ok(detections.into_iter().next())
    }

    /// Encode the best face in the image. `Ok(None)` means no face was found.
    pub fn encode_face(&mut self, img: &DynamicImage) -> Result<Option<Embedding>> {
        let Some(best) = self.detect_best(img)? else {
            return Ok(None);
        };
        let face = detect::crop_detection(img, &best, CROP_MARGIN);
        let embedding = encode::encode_face(&mut self.encoder, &face).context("encoding face")?;
        Ok(Some(embedding))
    }
}

/// Detect → crop → classify pipeline for emotions. The classifier only ever
/// sees the cropped face, mirroring the recognition path; it carries its own
/// detector session so it works standalone.
pub struct EmotionNet {
    detector: Session,
    classifier: Session,
}

impl EmotionNet {
    pub fn open(paths: &ModelPaths) -> Result<Self> {
        Ok(Self {
            detector: model::session_from_file(&paths.detector)
                .context("initializing face detector")?,
            classifier: model::session_from_file(&paths.emotion)
                .context("initializing emotion classifier")?,
        })
    }

    /// Score the best face in the image. `Ok(None)` means no face was found.
    pub fn score(&mut self, img: &DynamicImage) -> Result<Option<EmotionScores>> {
        let detections = detect::detect_faces(
            &mut self.detector,
            img,
            DETECT_SCORE_THRESHOLD,
            NMS_IOU_THRESHOLD,
        )
        .context("detecting faces")?;
        let Some(best) = detections.into_iter().next() else {
            return Ok(None);
        };
        let face = detect::crop_detection(img, &best, CROP_MARGIN);
        let scores =
            emotion::score_face(&mut self.classifier, &face).context("scoring emotions")?;
        Ok(Some(scores))
    }
}
