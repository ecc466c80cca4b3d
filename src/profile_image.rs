//! Pet profile images, normalized to one JPEG per pet.

use crate::error::{ApiError, ApiResult};
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "tiff", "webp", "heif", "heic"];

pub struct ProfileImageStore {
    profile_dir: PathBuf,
    default_image: PathBuf,
}

impl ProfileImageStore {
    pub fn new(profile_dir: PathBuf, default_image: PathBuf) -> Result<Self> {
        fs::create_dir_all(&profile_dir)?;
        Ok(Self {
            profile_dir,
            default_image,
        })
    }

    /// Decodes the upload, converts to three-channel RGB and writes
    /// `{pet_id}.jpeg`, replacing any previous image for the pet. The
    /// declared filename only gates the upload; the stored format is always
    /// JPEG.
    pub fn store(
        &self,
        pet_id: i64,
        image_bytes: &[u8],
        declared_filename: &str,
    ) -> ApiResult<String> {
        let extension = declared_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .ok_or_else(|| {
                ApiError::WrongFileType("Could not determine the file extension".to_string())
            })?;
        if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ApiError::WrongFileType(
                "Only image uploads are accepted".to_string(),
            ));
        }

        let decoded = image::load_from_memory(image_bytes)
            .context("Failed to decode uploaded image")?;
        let rgb = decoded.to_rgb8();

        let photo_id = format!("{}.jpeg", pet_id);
        let path = self.profile_dir.join(&photo_id);
        rgb.save_with_format(&path, image::ImageFormat::Jpeg)
            .context("Failed to encode profile image")?;
        Ok(photo_id)
    }

    /// Path to the stored image for a file id, ignoring any extension the
    /// caller tacked on; the default asset when the pet has no image.
    pub fn resolve(&self, file_id: &str) -> PathBuf {
        let stem = file_id.split('.').next().unwrap_or(file_id);
        let path = self.profile_dir.join(format!("{}.jpeg", stem));
        if path.is_file() {
            path
        } else {
            self.default_image.clone()
        }
    }
}
