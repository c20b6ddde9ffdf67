#![forbid(unsafe_code)]

pub mod model;
pub mod normalize;
pub mod strategy;
pub mod time;
pub mod validation;

pub use time::Clock;
