use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use uuid::Uuid;

use crate::{
    constants::{IMAGE_TYPES, RECIPE_IMAGE_DIR},
    error::{Error, HtmlError, ValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Parses `data:image/<type>;base64,<payload>`.
pub fn decode_data_uri(value: &str) -> Result<DecodedImage, ValidationError> {
    let invalid = || ValidationError::new("image", "Upload a valid image.");

    let rest = value.strip_prefix("data:").ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime = header.strip_suffix(";base64").ok_or_else(invalid)?;

    let extension = IMAGE_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(mime))
        .map(|(_, extension)| *extension)
        .ok_or_else(invalid)?;

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }

    Ok(DecodedImage { extension, bytes })
}

/// Writes the image under `media_root` and returns its path relative to it.
pub async fn save_image(media_root: &Path, image: DecodedImage) -> Result<String, Error> {
    let relative = format!("{RECIPE_IMAGE_DIR}/{}.{}", Uuid::new_v4(), image.extension);
    let target = media_root.join(&relative);

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            log::error!("Could not create image directory {}: {e}", parent.display());
            HtmlError::InternalServerError.default()
        })?;
    }

    tokio::fs::write(&target, &image.bytes).await.map_err(|e| {
        log::error!("Could not write image {}: {e}", target.display());
        HtmlError::InternalServerError.default()
    })?;

    log::debug!("Stored {} byte image at {relative}", image.bytes.len());
    Ok(relative)
}

/// Best effort; a missing file is not an error.
pub async fn remove_image(media_root: &Path, relative: &str) {
    let target = media_root.join(relative);
    if let Err(e) = tokio::fs::remove_file(&target).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not remove image {}: {e}", target.display());
        }
    }
}
