//! Source-over compositing of a layer stack.

use anyhow::{Result, bail};
use image::{DynamicImage, imageops::overlay};
use prioritile_derive::context;

/// Composites `layers` back-to-front: the first layer is the bottom, each following layer is
/// blended over the result so far.
///
/// The output has the bounds of the bottom layer and is always RGBA8. Layers of other sizes are
/// blended where they intersect the bottom layer; pixels outside an upper layer stay unchanged.
#[context("compositing {} layers", layers.len())]
pub fn compose(layers: &[DynamicImage]) -> Result<DynamicImage> {
	let Some((bottom, upper)) = layers.split_first() else {
		bail!("nothing to composite");
	};

	let mut canvas = bottom.to_rgba8();
	for layer in upper {
		if let Some(buffer) = layer.as_rgba8() {
			overlay(&mut canvas, buffer, 0, 0);
		} else {
			overlay(&mut canvas, &layer.to_rgba8(), 0, 0);
		}
	}

	Ok(DynamicImage::ImageRgba8(canvas))
}
