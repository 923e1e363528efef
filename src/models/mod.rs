pub mod generation;
pub mod image;

pub use self::generation::*;
pub use self::image::*;
