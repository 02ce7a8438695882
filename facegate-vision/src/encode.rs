use anyhow::Result;
use image::DynamicImage;
use ndarray::Array4;
use ort::{session::Session, value::Value};

/// Output dimensionality of the SFace encoder.
pub const EMBEDDING_DIM: usize = 128;

/// L2-normalized face feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// Encode a cropped face image to an embedding.
///
/// The encoder expects [1, 3, 112, 112] BGR input with values in [0, 255].
pub fn encode_face(session: &mut Session, face_img: &DynamicImage) -> Result<Embedding> {
    let size = 112u32;
    let face_rgb = face_img
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();

    // CHW in BGR channel order
    let pixel_count = (size * size) as usize;
    let mut input_data = vec![0.0f32; 3 * pixel_count];
    let (b_channel, rest) = input_data.split_at_mut(pixel_count);
    let (g_channel, r_channel) = rest.split_at_mut(pixel_count);
    let pixels = face_rgb.as_raw();
    for i in 0..pixel_count {
        let idx = i * 3;
        r_channel[i] = pixels[idx] as f32;
        g_channel[i] = pixels[idx + 1] as f32;
        b_channel[i] = pixels[idx + 2] as f32;
    }

    let input_array = Array4::from_shape_vec((1, 3, size as usize, size as usize), input_data)?;
    let input_tensor = Value::from_array(input_array)?;

    let outputs = session.run(ort::inputs![input_tensor])?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

    // Expecting shape [1, 128]
    let embedding_size = if shape.len() == 2 {
        shape[1] as usize
    } else {
        data.len()
    };
    let raw: Vec<f32> = data[0..embedding_size].to_vec();

    Ok(Embedding {
        vector: l2_normalize(raw),
    })
}

fn l2_normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector
    }
}
