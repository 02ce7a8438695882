use image::DynamicImage;
use log::{info, warn};
use serde::Serialize;

use crate::config::Config;
use crate::emotion::{self, EmotionClassifier, EmotionReading, Greeting, OrtEmotionClassifier};
use crate::encoder::{FaceEncoder, OrtFaceEncoder};
use crate::enroll::{self, EnrollmentReport};
use crate::error::{Error, Result};
use crate::matcher::{self, MatchOutcome};
use crate::probe;
use crate::store::EncodingStore;

/// Which optional pipelines are usable, decided once at startup from the
/// model files on disk rather than by catching load failures mid-request.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Capabilities {
    pub face_recognition: bool,
    pub emotion_detection: bool,
}

impl Capabilities {
    pub fn probe(cfg: &Config) -> Self {
        let paths = facegate_vision::ModelPaths::in_dir(&cfg.model_dir);
        let caps = Self {
            face_recognition: paths.recognition_available(),
            emotion_detection: paths.emotion_available(),
        };
        if !caps.face_recognition {
            warn!(
                "recognition models missing under {}; enrollment and matching disabled",
                cfg.model_dir.display()
            );
        }
        if !caps.emotion_detection {
            info!("emotion model missing; greetings will use the neutral default");
        }
        caps
    }
}

/// Result of one login attempt: match decision, best-effort emotion, and the
/// greeting to speak when matched.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    #[serde(flatten)]
    pub outcome: MatchOutcome,
    pub emotion: EmotionReading,
    pub greeting: Option<Greeting>,
}

/// Face authentication service: owns the encoding store, the (optional)
/// encoder, and the (optional) emotion classifier. Callers construct and
/// hold it for the process lifetime.
pub struct FaceAuth {
    store: EncodingStore,
    threshold: f32,
    encoder: Option<Box<dyn FaceEncoder>>,
    classifier: Option<Box<dyn EmotionClassifier>>,
}

impl FaceAuth {
    /// Build the service from config, probing capabilities first. Missing
    /// models degrade the service instead of failing construction.
    pub fn open(cfg: &Config) -> Result<Self> {
        let caps = Capabilities::probe(cfg);
        let paths = facegate_vision::ModelPaths::in_dir(&cfg.model_dir);

        let encoder: Option<Box<dyn FaceEncoder>> = if caps.face_recognition {
            Some(Box::new(OrtFaceEncoder::open(&paths)?))
        } else {
            None
        };
        let classifier: Option<Box<dyn EmotionClassifier>> = if caps.emotion_detection {
            match OrtEmotionClassifier::open(&paths) {
                Ok(c) => Some(Box::new(c)),
                Err(e) => {
                    warn!("emotion classifier failed to load, continuing without it: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            store: EncodingStore::open(&cfg.store_dir)?,
            threshold: cfg.threshold,
            encoder,
            classifier,
        })
    }

    /// Assembly seam for tests and embedders.
    pub fn with_parts(
        store: EncodingStore,
        threshold: f32,
        encoder: Option<Box<dyn FaceEncoder>>,
        classifier: Option<Box<dyn EmotionClassifier>>,
    ) -> Self {
        Self {
            store,
            threshold,
            encoder,
            classifier,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            face_recognition: self.encoder.is_some(),
            emotion_detection: self.classifier.is_some(),
        }
    }

    pub fn store(&self) -> &EncodingStore {
        &self.store
    }

    fn encoder_mut(&mut self) -> Result<&mut (dyn FaceEncoder + 'static)> {
        self.encoder
            .as_deref_mut()
            .ok_or_else(|| Error::EncoderUnavailable("recognition models not installed".into()))
    }

    /// Enroll an identity from a batch of images (see [`enroll::enroll`]).
    pub fn enroll(&mut self, identity: &str, images: &[DynamicImage]) -> Result<EnrollmentReport> {
        let store = self.store.clone();
        let encoder = self.encoder_mut()?;
        let report = enroll::enroll(encoder, &store, identity, images)?;
        info!(
            "enrolled {}: {} image(s) used, {} skipped",
            report.identity, report.images_used, report.images_skipped
        );
        Ok(report)
    }

    /// One login attempt against the whole store.
    pub fn identify(&mut self, img: &DynamicImage) -> Result<LoginOutcome> {
        let records = self.store.load_all()?;
        if records.is_empty() {
            return Err(Error::NoEncodingsAvailable);
        }

        let encoder = self.encoder_mut()?;
        let vector = encoder.encode(img)?.ok_or(Error::NoFaceDetected)?;
        let outcome = matcher::match_probe(&records, &vector, self.threshold)?;

        let emotion = self.classify_or_neutral(img);
        let greeting = outcome
            .identity
            .as_deref()
            .map(|identity| emotion::greeting_for(&emotion, identity, "", &[]));

        match &outcome.identity {
            Some(id) => info!(
                "matched {} at distance {:.3} (threshold {:.3})",
                id, outcome.distance, outcome.threshold
            ),
            None => info!(
                "no match; minimum distance {:.3} (threshold {:.3})",
                outcome.distance, outcome.threshold
            ),
        }

        Ok(LoginOutcome {
            outcome,
            emotion,
            greeting,
        })
    }

    /// Login attempt from a base64 payload (optionally a data URL).
    pub fn identify_base64(&mut self, payload: &str) -> Result<LoginOutcome> {
        let img = probe::decode_probe(payload)?;
        self.identify(&img)
    }

    /// Emotion estimation never fails the request: any classifier problem
    /// collapses to the neutral reading.
    fn classify_or_neutral(&mut self, img: &DynamicImage) -> EmotionReading {
        match self.classifier.as_deref_mut() {
            Some(classifier) => match classifier.classify(img) {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("emotion classification failed: {e}");
                    EmotionReading::neutral()
                }
            },
            None => EmotionReading::neutral(),
        }
    }

    /// Remove an identity's stored encoding. Returns whether one existed.
    pub fn purge(&self, identity: &str) -> Result<bool> {
        self.store.remove(identity)
    }

    pub fn identities(&self) -> Result<Vec<String>> {
        self.store.identities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_vision::model::{DETECTOR_FILE, EMOTION_FILE, ENCODER_FILE};
    use tempfile::TempDir;

    fn config_with_models(tmp: &TempDir, files: &[&str]) -> Config {
        let model_dir = tmp.path().join("models");
        std::fs::create_dir_all(&model_dir).unwrap();
        for file in files {
            std::fs::write(model_dir.join(file), b"").unwrap();
        }
        Config {
            threshold: 0.48,
            store_dir: tmp.path().join("encodings"),
            model_dir,
        }
    }

    #[test]
    fn capabilities_all_off_without_models() {
        let tmp = TempDir::new().unwrap();
        let caps = Capabilities::probe(&config_with_models(&tmp, &[]));
        assert!(!caps.face_recognition);
        assert!(!caps.emotion_detection);
    }

    #[test]
    fn emotion_capability_requires_the_detector_model() {
        let tmp = TempDir::new().unwrap();
        // classifier alone cannot run: it scores the detected face crop
        let caps = Capabilities::probe(&config_with_models(&tmp, &[EMOTION_FILE]));
        assert!(!caps.emotion_detection);

        let caps = Capabilities::probe(&config_with_models(&tmp, &[DETECTOR_FILE, EMOTION_FILE]));
        assert!(caps.emotion_detection);
        assert!(!caps.face_recognition);
    }

    #[test]
    fn recognition_capability_needs_detector_and_encoder() {
        let tmp = TempDir::new().unwrap();
        let caps = Capabilities::probe(&config_with_models(&tmp, &[DETECTOR_FILE]));
        assert!(!caps.face_recognition);

        let caps = Capabilities::probe(&config_with_models(&tmp, &[DETECTOR_FILE, ENCODER_FILE]));
        assert!(caps.face_recognition);
    }
}
