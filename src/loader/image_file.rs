//! Raster image documents.

use crate::core::{ExtractError, ExtractResult};
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Loads an image file as a single RGB page at its native resolution.
pub fn render_image(path: &Path) -> ExtractResult<RgbImage> {
    let img = image::open(path).map_err(|e| ExtractError::load_error(path, e.to_string()))?;
    Ok(to_rgb(img))
}

fn to_rgb(img: DynamicImage) -> RgbImage {
    match img {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_render_image_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbaImage::from_pixel(6, 4, Rgba([10, 20, 30, 128]))
            .save(&path)
            .unwrap();

        let page = render_image(&path).unwrap();
        assert_eq!(page.dimensions(), (6, 4));
        assert_eq!(page.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_corrupt_image_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            render_image(&path),
            Err(ExtractError::Load { .. })
        ));
    }
}
