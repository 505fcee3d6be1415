pub mod cache;
pub mod decode;
pub mod feature;
pub mod loader;
pub mod source;

pub use cache::*;
pub use decode::*;
pub use feature::*;
pub use loader::*;
pub use source::*;
