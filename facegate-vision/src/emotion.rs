use anyhow::Result;
use image::DynamicImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// Class order of the FER-style classifier head.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

/// Per-category confidences, softmaxed, same order as [`EMOTION_LABELS`].
#[derive(Debug, Clone, Copy)]
pub struct EmotionScores {
    pub scores: [f32; 7],
}

impl EmotionScores {
    /// Index and confidence of the dominant category.
    pub fn dominant(&self) -> (usize, f32) {
        self.scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, s)| {
                if s > best.1 {
                    (i, s)
                } else {
                    best
                }
            })
    }
}

/// Score a cropped face against the 7 emotion categories.
///
/// The classifier expects [1, 1, 64, 64] grayscale input scaled to [0, 1].
pub fn score_face(session: &mut Session, face_img: &DynamicImage) -> Result<EmotionScores> {
    let size = 64u32;
    let gray = face_img
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
        .to_luma8();

    let input_data: Vec<f32> = gray.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    let input_array = Array4::from_shape_vec((1, 1, size as usize, size as usize), input_data)?;
    let input_tensor = Value::from_array(input_array)?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;

    let mut logits = [0.0f32; 7];
    for (slot, value) in logits.iter_mut().zip(data.iter()) {
        *slot = *value;
    }

    Ok(EmotionScores {
        scores: softmax(logits),
    })
}

fn softmax(logits: [f32; 7]) -> [f32; 7] {
    let max = logits.iter().copied().fold(f32::MIN, f32::max);
    let exps = logits.map(|x| (x - max).exp());
    let sum: f32 = exps.iter().sum();
    exps.map(|x| x / sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let s = softmax([1.0, 2.0, 3.0, 0.0, -1.0, 0.5, 2.5]);
        let sum: f32 = s.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_dominant_picks_max() {
        let scores = EmotionScores {
            scores: [0.1, 0.0, 0.05, 0.6, 0.1, 0.05, 0.1],
        };
        let (idx, conf) = scores.dominant();
        assert_eq!(EMOTION_LABELS[idx], "happy");
        assert!((conf - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_softmax_dominant_matches_largest_logit() {
        let s = softmax([0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
        let scores = EmotionScores { scores: s };
        assert_eq!(EMOTION_LABELS[scores.dominant().0], "sad");
    }
}
