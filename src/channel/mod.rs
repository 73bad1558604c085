//! Export contents of `channel` folder
mod output;

pub use self::output::*;
