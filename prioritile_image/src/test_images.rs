use image::{DynamicImage, Rgba, RgbaImage};

pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> DynamicImage {
	DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// Colors and alpha both vary with position; the top-left pixel is fully transparent.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
	DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
		Rgba([
			(x * 255 / width.max(2).saturating_sub(1)) as u8,
			(y * 255 / height.max(2).saturating_sub(1)) as u8,
			128,
			((x + y) * 255 / (width + height).max(3).saturating_sub(2)) as u8,
		])
	}))
}
