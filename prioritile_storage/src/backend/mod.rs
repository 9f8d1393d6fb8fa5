mod local;
pub use local::*;

mod object;
pub use object::*;

mod traits;
pub use traits::*;
