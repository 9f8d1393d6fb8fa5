//! Contains the tile coordinate codec, zoom ranges, error kinds and the terminal progress bar
//! shared by all prioritile crates.

mod error;
pub use error::*;

pub mod progress;

pub mod types;
pub use types::*;
