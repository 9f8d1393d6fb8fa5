//! Pixel work for prioritile: decoding and encoding tiles, classifying their transparency and
//! compositing stacks of layers.

mod alpha;
pub use alpha::*;

mod codec;
pub use codec::*;

mod compose;
pub use compose::*;

#[cfg(test)]
pub(crate) mod test_images;
