//! Conversion between encoded tile bytes and decoded images.
//!
//! The tile format is the file extension of the tile path (`png`, `jpg`, `jpeg`, `webp`). Formats
//! the `image` crate does not know, as well as any codec failure, surface as
//! [`MergeError::Decode`] or [`MergeError::Encode`].

use anyhow::Result;
use image::{DynamicImage, ImageFormat, load_from_memory_with_format};
use prioritile_core::{Blob, MergeError};
use std::{borrow::Cow, io::Cursor};

fn image_format(format: &str) -> Option<ImageFormat> {
	ImageFormat::from_extension(format)
}

pub fn decode_tile(blob: &Blob, format: &str) -> Result<DynamicImage> {
	let decode_error = |source: prioritile_core::BoxError| MergeError::Decode {
		format: format.to_string(),
		source,
	};

	let Some(image_format) = image_format(format) else {
		return Err(decode_error(format!("unknown tile format {format:?}").into()).into());
	};

	load_from_memory_with_format(blob.as_slice(), image_format).map_err(|e| decode_error(e.into()).into())
}

pub fn encode_tile(image: &DynamicImage, format: &str) -> Result<Blob> {
	let encode_error = |source: prioritile_core::BoxError| MergeError::Encode {
		format: format.to_string(),
		source,
	};

	let Some(image_format) = image_format(format) else {
		return Err(encode_error(format!("unknown tile format {format:?}").into()).into());
	};

	let image = encodable(image, image_format);
	let mut buffer = Vec::new();
	image
		.write_to(&mut Cursor::new(&mut buffer), image_format)
		.map_err(|e| encode_error(e.into()))?;

	log::trace!(
		"encoded {}x{} {:?} image as {format} ({} bytes)",
		image.width(),
		image.height(),
		image.color(),
		buffer.len()
	);
	Ok(Blob::from(buffer))
}

/// Converts `image` into a pixel layout the encoder for `format` accepts.
///
/// JPEG has no alpha channel, so alpha is dropped. The lossless WebP encoder only takes RGB8 and RGBA8.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
	use DynamicImage::*;
	match (format, image) {
		(ImageFormat::Jpeg, ImageRgb8(_) | ImageLuma8(_)) => Cow::Borrowed(image),
		(ImageFormat::Jpeg, _) => Cow::Owned(ImageRgb8(image.to_rgb8())),
		(ImageFormat::WebP, ImageRgb8(_) | ImageRgba8(_)) => Cow::Borrowed(image),
		(ImageFormat::WebP, _) => Cow::Owned(ImageRgba8(image.to_rgba8())),
		_ => Cow::Borrowed(image),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_images::{gradient, solid};
	use image::{ColorType, GenericImageView};
	use rstest::rstest;

	#[rstest]
	#[case::png("png", gradient(16, 16))]
	#[case::webp("webp", solid(16, 16, [30, 60, 90, 200]))]
	fn lossless_formats_keep_pixels(#[case] format: &str, #[case] image: DynamicImage) -> Result<()> {
		let blob = encode_tile(&image, format)?;
		let decoded = decode_tile(&blob, format)?;

		assert_eq!(decoded.dimensions(), (16, 16));
		assert_eq!(decoded.to_rgba8(), image.to_rgba8());
		Ok(())
	}

	#[rstest]
	#[case::jpg("jpg")]
	#[case::jpeg("jpeg")]
	fn jpeg_drops_alpha(#[case] format: &str) -> Result<()> {
		let blob = encode_tile(&solid(8, 8, [200, 10, 10, 255]), format)?;
		let decoded = decode_tile(&blob, format)?;

		assert_eq!(decoded.color(), ColorType::Rgb8);
		let [r, g, b] = decoded.to_rgb8().get_pixel(4, 4).0;
		assert!(r > 180 && g < 40 && b < 40, "unexpected pixel {:?}", [r, g, b]);
		Ok(())
	}

	#[test]
	fn sixteen_bit_images_encode_as_png() -> Result<()> {
		let image = DynamicImage::ImageRgba16(gradient(4, 4).to_rgba16());
		let decoded = decode_tile(&encode_tile(&image, "png")?, "png")?;
		assert_eq!(decoded.color(), ColorType::Rgba16);
		Ok(())
	}

	#[test]
	fn corrupt_bytes_fail_to_decode() {
		let err = decode_tile(&Blob::from(vec![1, 2, 3, 4]), "png").unwrap_err();
		assert!(matches!(MergeError::find(&err), Some(MergeError::Decode { format, .. }) if format == "png"));
	}

	#[test]
	fn unknown_format_is_a_codec_error() {
		let err = decode_tile(&Blob::from(vec![0; 8]), "tile").unwrap_err();
		assert!(matches!(MergeError::find(&err), Some(MergeError::Decode { .. })));
		assert_eq!(format!("{:#}", err), "failed to decode \"tile\" tile: unknown tile format \"tile\"");

		let err = encode_tile(&solid(1, 1, [0, 0, 0, 255]), "tile").unwrap_err();
		assert!(matches!(MergeError::find(&err), Some(MergeError::Encode { .. })));
	}
}
