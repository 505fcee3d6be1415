pub mod color;
pub mod device;
pub mod draw;
pub mod error;
pub mod program;
pub mod recording;

pub use color::*;
pub use device::*;
pub use draw::*;
pub use error::*;
pub use program::*;
