//! Local checks a request must pass before anything goes on the wire.

use dewmap_common::config::ADMIN_PAGE_SIZE_MAX;
use dewmap_common::{ImageAttachment, NewFind};
use thiserror::Error;

/// Declared MIME types the upload endpoint accepts.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

/// 8 MiB.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill all required fields")]
    MissingFields,

    #[error("only png, jpg, webp, or gif files are allowed")]
    UnsupportedImageType(String),

    #[error("image must be under 8MB")]
    ImageTooLarge(usize),

    #[error("username and password are required")]
    MissingCredentials,

    #[error("page size must be between 1 and 200, got {0}")]
    PageSize(u32),
}

/// Moderation pages are bounded server-side; catch bad sizes here instead.
pub fn validate_page_size(limit: u32) -> Result<u32, ValidationError> {
    if limit == 0 || limit > ADMIN_PAGE_SIZE_MAX {
        return Err(ValidationError::PageSize(limit));
    }
    Ok(limit)
}

/// Check an attachment's declared type and size.
pub fn validate_image(image: &ImageAttachment) -> Result<(), ValidationError> {
    let declared = image.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
        return Err(ValidationError::UnsupportedImageType(image.content_type.clone()));
    }
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(ValidationError::ImageTooLarge(image.bytes.len()));
    }
    Ok(())
}

/// Validate a form submission and return the trimmed payload to send.
pub fn validate_new_find(new: &NewFind) -> Result<NewFind, ValidationError> {
    let flavor = new.flavor.trim();
    let size = new.size.trim();
    let location_name = new.location_name.trim();
    let address = new.address.trim();

    if [flavor, size, location_name, address].iter().any(|f| f.is_empty()) {
        return Err(ValidationError::MissingFields);
    }

    if let Some(image) = &new.image {
        validate_image(image)?;
    }

    Ok(NewFind {
        flavor: flavor.to_string(),
        size: size.to_string(),
        location_name: location_name.to_string(),
        address: address.to_string(),
        image_url: new
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from),
        image: new.image.clone(),
    })
}

/// Guess a declared MIME type from a file extension, the way a browser file
/// picker would.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
