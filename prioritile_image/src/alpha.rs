//! Transparency classification of decoded tiles.
//!
//! A pixel is *opaque* when its alpha is at the maximum of its sample type, *transparent* when its
//! alpha is zero and *translucent* otherwise. Images without an alpha channel are opaque.

use image::{DynamicImage, Pixel};

/// Transparency summary of an image.
///
/// `is_fully_opaque` and `has_any_alpha` are driven by the same predicate ("some pixel is not
/// opaque") and therefore always disagree. `is_nodata` is set when every pixel is fully
/// transparent; such a tile carries no data at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlphaClassification {
	pub is_fully_opaque: bool,
	pub has_any_alpha: bool,
	pub is_nodata: bool,
}

impl AlphaClassification {
	const OPAQUE: AlphaClassification = AlphaClassification {
		is_fully_opaque: true,
		has_any_alpha: false,
		is_nodata: false,
	};
}

#[derive(Clone, Copy)]
enum Level {
	Opaque,
	Translucent,
	Transparent,
}

fn level<T: PartialEq + Default>(alpha: T, max: T) -> Level {
	if alpha == max {
		Level::Opaque
	} else if alpha == T::default() {
		Level::Transparent
	} else {
		Level::Translucent
	}
}

/// Classifies the alpha channel of `image`, scanning pixels row-major.
///
/// The scan stops as soon as both a non-opaque and a non-transparent pixel have been seen, since
/// no further pixel can change the result. An image without pixels counts as no-data.
pub fn classify(image: &DynamicImage) -> AlphaClassification {
	if !image.color().has_alpha() {
		return AlphaClassification::OPAQUE;
	}

	match image {
		DynamicImage::ImageRgba8(buffer) => scan(buffer.pixels().map(|p| level(p.0[3], u8::MAX))),
		DynamicImage::ImageLumaA8(buffer) => scan(buffer.pixels().map(|p| level(p.0[1], u8::MAX))),
		DynamicImage::ImageRgba16(buffer) => scan(buffer.pixels().map(|p| level(p.0[3], u16::MAX))),
		DynamicImage::ImageLumaA16(buffer) => scan(buffer.pixels().map(|p| level(p.0[1], u16::MAX))),
		other => scan(other.to_rgba8().pixels().map(|p| level(p.channels()[3], u8::MAX))),
	}
}

fn scan(levels: impl Iterator<Item = Level>) -> AlphaClassification {
	let mut seen_non_opaque = false;
	let mut seen_visible = false;

	for level in levels {
		match level {
			Level::Opaque => seen_visible = true,
			Level::Translucent => {
				seen_non_opaque = true;
				seen_visible = true;
			}
			Level::Transparent => seen_non_opaque = true,
		}
		if seen_non_opaque && seen_visible {
			break;
		}
	}

	AlphaClassification {
		is_fully_opaque: !seen_non_opaque,
		has_any_alpha: seen_non_opaque,
		is_nodata: !seen_visible,
	}
}
