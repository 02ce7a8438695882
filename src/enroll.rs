use image::DynamicImage;
use log::{debug, warn};
use serde::Serialize;

use crate::encoder::FaceEncoder;
use crate::error::{Error, Result};
use crate::store::{EncodingRecord, EncodingStore};

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReport {
    pub identity: String,
    pub images_used: u32,
    pub images_skipped: u32,
}

/// Enroll one identity from a batch of images.
///
/// Every image is encoded independently; images without a detectable face
/// are skipped. The element-wise mean of the remaining vectors replaces any
/// previously stored encoding for the identity. Fails with
/// [`Error::NoFaceDetected`] (store untouched) when no image yields a face.
pub fn enroll(
    encoder: &mut dyn FaceEncoder,
    store: &EncodingStore,
    identity: &str,
    images: &[DynamicImage],
) -> Result<EnrollmentReport> {
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(images.len());
    let mut skipped = 0u32;

    for (i, img) in images.iter().enumerate() {
        match encoder.encode(img)? {
            Some(vector) => {
                debug!("image {}: face encoded ({} dims)", i + 1, vector.len());
                vectors.push(vector);
            }
            None => {
                warn!("image {}: no face detected, skipping", i + 1);
                skipped += 1;
            }
        }
    }

    if vectors.is_empty() {
        return Err(Error::NoFaceDetected);
    }

    let averaged = mean_vector(&vectors);
    let record = EncodingRecord::new(identity, averaged, vectors.len() as u32);
    store.save(&record)?;

    Ok(EnrollmentReport {
        identity: identity.to_string(),
        images_used: record.images_used,
        images_skipped: skipped,
    })
}

/// Element-wise arithmetic mean. All vectors are expected to share the
/// encoder's fixed dimensionality.
pub fn mean_vector(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
    let mut sum = vec![0.0f32; dim];
    for vector in vectors {
        debug_assert_eq!(vector.len(), dim);
        for (slot, value) in sum.iter_mut().zip(vector.iter()) {
            *slot += value;
        }
    }
    let n = vectors.len() as f32;
    for slot in &mut sum {
        *slot /= n;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_single_vector_is_itself() {
        assert_eq!(mean_vector(&[vec![0.5, -1.0, 2.0]]), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn mean_is_element_wise() {
        let m = mean_vector(&[vec![1.0, 0.0, 3.0], vec![3.0, 2.0, 1.0]]);
        assert_eq!(m, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn mean_of_empty_input_is_empty() {
        assert!(mean_vector(&[]).is_empty());
    }
}
