//! Export contents of `mot` folder
mod detection;
mod errors;
mod track;
mod tracker;

pub use self::{
    detection::*,
    errors::*,
    track::*,
    tracker::*,
};
pub(crate) use self::tracker::check_range;
