use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use ort::{session::Session, value::Value};

// Detector input geometry (UltraFace RFB-320)
const INPUT_W: u32 = 320;
const INPUT_H: u32 = 240;

/// A detected face in original-image pixel coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
}

/// Detect faces in an image. Returns detections sorted by descending score
/// after non-maximum suppression.
pub fn detect_faces(
    session: &mut Session,
    img: &DynamicImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let (orig_w, orig_h) = img.dimensions();
    let resized = img.resize_exact(INPUT_W, INPUT_H, image::imageops::FilterType::Triangle);
    let rgb = resized.to_rgb8();

    // CHW float input, normalized to roughly [-1, 1]
    let pixel_count = (INPUT_W * INPUT_H) as usize;
    let mut input_data = vec![0.0f32; 3 * pixel_count];
    let (r_channel, rest) = input_data.split_at_mut(pixel_count);
    let (g_channel, b_channel) = rest.split_at_mut(pixel_count);
    let pixels = rgb.as_raw();
    for i in 0..pixel_count {
        let idx = i * 3;
        r_channel[i] = (pixels[idx] as f32 - 127.0) / 128.0;
        g_channel[i] = (pixels[idx + 1] as f32 - 127.0) / 128.0;
        b_channel[i] = (pixels[idx + 2] as f32 - 127.0) / 128.0;
    }

    let input_array =
        Array4::from_shape_vec((1, 3, INPUT_H as usize, INPUT_W as usize), input_data)?;
    let input_tensor = Value::from_array(input_array)?;

    let outputs = session.run(ort::inputs![input_tensor])?;

    // The model emits per-anchor class confidences [1, N, 2] and corner-form
    // boxes [1, N, 4] in normalized coordinates. Output order varies between
    // exports, so identify them by trailing dimension.
    let mut scores: Option<Vec<f32>> = None;
    let mut boxes: Option<Vec<f32>> = None;
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        match dims.last() {
            Some(&2) => scores = Some(data.to_vec()),
            Some(&4) => boxes = Some(data.to_vec()),
            _ => {}
        }
    }
    let (scores, boxes) = match (scores, boxes) {
        (Some(s), Some(b)) => (s, b),
        _ => bail!("unexpected detector output layout"),
    };

    let anchors = scores.len() / 2;
    if boxes.len() < anchors * 4 {
        bail!("detector score/box counts disagree");
    }

    let mut detections = Vec::new();
    for i in 0..anchors {
        let score = scores[i * 2 + 1];
        if score < score_threshold {
            continue;
        }
        let x1 = boxes[i * 4] * orig_w as f32;
        let y1 = boxes[i * 4 + 1] * orig_h as f32;
        let x2 = boxes[i * 4 + 2] * orig_w as f32;
        let y2 = boxes[i * 4 + 3] * orig_h as f32;
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        detections.push(Detection {
            bbox: [x1, y1, x2 - x1, y2 - y1],
            score,
        });
    }

    Ok(nms(&detections, nms_threshold))
}

/// Non-maximum suppression over IoU.
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return vec![];
    }

    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|kept| compute_iou(&kept.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    let area_a = a[2] * a[3];
    let area_b = b[2] * b[3];
    inter / (area_a + area_b - inter)
}

/// Crop a detection out of the source image, clamped to image bounds, with a
/// small margin so the encoder sees some context around the face.
pub fn crop_detection(img: &DynamicImage, detection: &Detection, margin: f32) -> DynamicImage {
    let (img_w, img_h) = img.dimensions();
    let [x, y, w, h] = detection.bbox;
    let mx = w * margin;
    let my = h * margin;

    let x0 = (x - mx).max(0.0) as u32;
    let y0 = (y - my).max(0.0) as u32;
    let x1 = ((x + w + mx) as u32).min(img_w);
    let y1 = ((y + h + my) as u32).min(img_h);

    let crop_w = x1.saturating_sub(x0).max(1);
    let crop_h = y1.saturating_sub(y0).max(1);
    img.crop_imm(x0, y0, crop_w, crop_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = [10.0, 10.0, 20.0, 20.0];
        let b = [15.0, 15.0, 20.0, 20.0];
        let iou = compute_iou(&a, &b);
        assert!(iou > 0.0 && iou < 1.0);

        // No overlap
        let c = [100.0, 100.0, 10.0, 10.0];
        assert_eq!(compute_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let detections = vec![
            Detection {
                bbox: [10.0, 10.0, 20.0, 20.0],
                score: 0.9,
            },
            Detection {
                bbox: [12.0, 12.0, 20.0, 20.0],
                score: 0.8,
            },
            Detection {
                bbox: [100.0, 100.0, 20.0, 20.0],
                score: 0.85,
            },
        ];

        let result = nms(&detections, 0.3);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].score, 0.9);
    }

    #[test]
    fn test_crop_clamps_to_bounds() {
        let img = DynamicImage::new_rgb8(100, 80);
        let det = Detection {
            bbox: [90.0, 70.0, 30.0, 30.0],
            score: 1.0,
        };
        let crop = crop_detection(&img, &det, 0.1);
        assert!(crop.width() <= 100);
        assert!(crop.height() <= 80);
    }
}
