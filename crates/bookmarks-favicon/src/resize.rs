use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::fetcher::Content;

/// Scale a PNG or JPEG icon to `width`, keeping the aspect ratio.
///
/// Other formats, and payloads that fail to decode or encode, are returned
/// unchanged.
pub fn resize_to_width(content: Content, width: u32) -> Content {
    let Some(format) = raster_format(&content) else {
        return content;
    };

    match scale(&content.payload, format, width) {
        Ok(payload) => Content { payload, ..content },
        Err(e) => {
            debug!(file = %content.file_name, error = %e, "favicon not resized");
            content
        }
    }
}

fn scale(payload: &[u8], format: ImageFormat, width: u32) -> image::ImageResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(payload, format)?;
    if img.width() == 0 {
        return Ok(payload.to_vec());
    }
    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width())).max(1);
    let resized = img.resize_exact(width, height as u32, FilterType::Nearest);

    // JPEG has no alpha channel
    let resized = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(resized.to_rgb8()),
        _ => resized,
    };

    let mut out = Cursor::new(Vec::new());
    resized.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

fn raster_format(content: &Content) -> Option<ImageFormat> {
    match content.mime_type.as_str() {
        "image/png" => return Some(ImageFormat::Png),
        "image/jpeg" => return Some(ImageFormat::Jpeg),
        _ => {}
    }
    let ext = content.file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}
