//! Value types used throughout prioritile.

mod blob;
pub use blob::*;

mod tile_coord;
pub use tile_coord::*;

mod zoom;
pub use zoom::*;
