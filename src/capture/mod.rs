//! Export contents of `capture` folder
mod config;
mod engine;
mod event;
mod policy;
mod quality;

pub use self::{
    config::*,
    engine::*,
    event::*,
    policy::*,
    quality::*,
};
