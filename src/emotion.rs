use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Emotion categories reported by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprise,
    Fear,
    Disgust,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprise => "surprise",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "angry" => Some(Emotion::Angry),
            "surprise" => Some(Emotion::Surprise),
            "fear" => Some(Emotion::Fear),
            "disgust" => Some(Emotion::Disgust),
            "neutral" => Some(Emotion::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort emotion estimate. Never gates authentication.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EmotionReading {
    pub emotion: Emotion,
    pub confidence: f32,
}

impl EmotionReading {
    /// Fallback when the classifier is unavailable or finds nothing.
    pub fn neutral() -> Self {
        Self {
            emotion: Emotion::Neutral,
            confidence: 0.0,
        }
    }
}

/// Seam over the external emotion classifier.
pub trait EmotionClassifier {
    fn classify(&mut self, img: &DynamicImage) -> Result<EmotionReading>;
}

/// ONNX-backed classifier: detects the face, crops it, and picks the
/// maximum-confidence category from the softmaxed class scores. Zero
/// detections collapse to the neutral reading.
pub struct OrtEmotionClassifier {
    net: facegate_vision::EmotionNet,
}

impl OrtEmotionClassifier {
    pub fn open(paths: &facegate_vision::ModelPaths) -> Result<Self> {
        let net = facegate_vision::EmotionNet::open(paths).map_err(Error::Pipeline)?;
        Ok(Self { net })
    }
}

impl EmotionClassifier for OrtEmotionClassifier {
    fn classify(&mut self, img: &DynamicImage) -> Result<EmotionReading> {
        let Some(scores) = self.net.score(img).map_err(Error::Pipeline)? else {
            return Ok(EmotionReading::neutral());
        };
        let (idx, confidence) = scores.dominant();
        let emotion = Emotion::from_label(facegate_vision::EMOTION_LABELS[idx])
            .unwrap_or(Emotion::Neutral);
        Ok(EmotionReading { emotion, confidence })
    }
}

/// Text-to-speech tuning attached to a greeting.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoiceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Greeting {
    pub text: String,
    pub voice: VoiceParams,
}

/// Compose the login greeting the frontend speaks aloud. Tone follows the
/// detected emotion; an empty designation is omitted entirely; active
/// project names are appended (at most two).
pub fn greeting_for(
    reading: &EmotionReading,
    name: &str,
    designation: &str,
    projects: &[String],
) -> Greeting {
    let role = if designation.is_empty() {
        String::new()
    } else {
        format!(" {designation}.")
    };

    let (text, voice) = match reading.emotion {
        Emotion::Happy => (
            format!("Great to see you smiling, {name}!{role} Welcome back!"),
            VoiceParams { rate: 1.1, pitch: 1.2, volume: 1.0 },
        ),
        Emotion::Sad => (
            format!("Hello {name}.{role} I hope you're doing okay. Welcome to the system."),
            VoiceParams { rate: 0.8, pitch: 0.9, volume: 0.9 },
        ),
        Emotion::Angry => (
            format!("Welcome {name}.{role} Take a deep breath, let's have a productive day."),
            VoiceParams { rate: 0.9, pitch: 0.8, volume: 0.8 },
        ),
        Emotion::Surprise => (
            format!("Well hello there, {name}!{role} Nice to see you!"),
            VoiceParams { rate: 1.0, pitch: 1.1, volume: 1.0 },
        ),
        Emotion::Fear => (
            format!("Welcome {name}.{role} Everything is alright, you're safe here."),
            VoiceParams { rate: 0.8, pitch: 0.9, volume: 0.8 },
        ),
        Emotion::Disgust => (
            format!("Hello {name}.{role} Hope you're having a better day now."),
            VoiceParams { rate: 0.9, pitch: 0.8, volume: 0.8 },
        ),
        Emotion::Neutral => (
            format!("Hello {name}.{role} Welcome to the system!"),
            VoiceParams { rate: 0.9, pitch: 1.0, volume: 1.0 },
        ),
    };

    let mut text = text;
    match projects {
        [] => {}
        [only] => text.push_str(&format!(" Currently working on {only} project.")),
        [first, second, ..] => {
            text.push_str(&format!(" Currently working on {first}, {second} projects."))
        }
    }

    Greeting { text, voice }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_fallback_has_zero_confidence() {
        let reading = EmotionReading::neutral();
        assert_eq!(reading.emotion, Emotion::Neutral);
        assert_eq!(reading.confidence, 0.0);
    }

    #[test]
    fn labels_round_trip() {
        for label in facegate_vision::EMOTION_LABELS {
            let emotion = Emotion::from_label(label).unwrap();
            assert_eq!(emotion.as_str(), label);
        }
    }

    #[test]
    fn greeting_mentions_at_most_two_projects() {
        let reading = EmotionReading {
            emotion: Emotion::Happy,
            confidence: 0.9,
        };
        let projects = vec!["Atlas".to_string(), "Borealis".to_string(), "Cygnus".to_string()];
        let greeting = greeting_for(&reading, "Priya", "Engineer", &projects);
        assert!(greeting.text.contains("Atlas, Borealis projects"));
        assert!(!greeting.text.contains("Cygnus"));
        assert!(greeting.voice.pitch > 1.0);
    }

    #[test]
    fn greeting_without_projects_has_no_project_clause() {
        let greeting = greeting_for(&EmotionReading::neutral(), "Sam", "Analyst", &[]);
        assert!(!greeting.text.contains("working on"));
        assert!(greeting.text.contains("Analyst."));
    }

    #[test]
    fn greeting_omits_empty_designation() {
        let greeting = greeting_for(&EmotionReading::neutral(), "Sam", "", &[]);
        assert_eq!(greeting.text, "Hello Sam. Welcome to the system!");
        assert!(!greeting.text.contains(". ."));

        let happy = EmotionReading {
            emotion: Emotion::Happy,
            confidence: 0.7,
        };
        let greeting = greeting_for(&happy, "Sam", "", &[]);
        assert!(!greeting.text.contains("! ."));
    }
}
