use image::DynamicImage;

use crate::error::{Error, Result};

/// Seam over the external face encoder. `Ok(None)` means the image contained
/// no detectable face; that image is skipped, not an error.
pub trait FaceEncoder {
    fn encode(&mut self, img: &DynamicImage) -> Result<Option<Vec<f32>>>;
}

/// ONNX-backed encoder: detect the best face, crop, encode to a 128-dim
/// L2-normalized vector.
pub struct OrtFaceEncoder {
    pipeline: facegate_vision::Pipeline,
}

impl OrtFaceEncoder {
    pub fn open(paths: &facegate_vision::ModelPaths) -> Result<Self> {
        let pipeline = facegate_vision::Pipeline::open(paths).map_err(Error::Pipeline)?;
        Ok(Self { pipeline })
    }
}

impl FaceEncoder for OrtFaceEncoder {
    fn encode(&mut self, img: &DynamicImage) -> Result<Option<Vec<f32>>> {
        let embedding = self.pipeline.encode_face(img).map_err(Error::Pipeline)?;
        Ok(embedding.map(|e| e.vector))
    }
}
