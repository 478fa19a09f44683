pub mod converter;
pub mod port;

pub use converter::*;
pub use port::*;
