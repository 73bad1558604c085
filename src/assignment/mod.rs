//! Export contents of `assignment` folder
mod munkres;

pub use self::munkres::*;
