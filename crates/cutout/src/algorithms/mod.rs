pub mod erasure;
pub mod scanning;
pub mod bounds;

pub use erasure::*;
pub use scanning::*;
pub use bounds::*;
