//! Export contents of `filter` folder
mod kalman;

pub use self::kalman::*;
