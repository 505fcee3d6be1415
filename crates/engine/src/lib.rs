pub mod engine;
pub mod options;

pub use engine::*;
pub use options::*;
