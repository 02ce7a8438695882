use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;

use crate::error::{Error, Result};

/// Decode a base64 probe payload into an image. Accepts both a bare base64
/// string and a `data:image/...;base64,` URL (header is stripped at the
/// first comma).
pub fn decode_probe(payload: &str) -> Result<DynamicImage> {
    let b64 = match payload.split_once(',') {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| Error::InvalidProbe(format!("base64: {e}")))?;
    image::load_from_memory(&bytes).map_err(|e| Error::InvalidProbe(format!("image: {e}")))
}

/// Load a probe image from disk (CLI path input).
pub fn load_probe(path: &Path) -> Result<DynamicImage> {
    image::open(path)
        .map_err(|e| Error::InvalidProbe(format!("{}: {e}", path.display())))
}
