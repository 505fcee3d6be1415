pub mod matrix;
pub mod mercator;
pub mod tile;
pub mod viewport;

// Projection crate: small, pure, well-tested primitives only.
pub use matrix::*;
pub use mercator::*;
pub use tile::*;
pub use viewport::*;
