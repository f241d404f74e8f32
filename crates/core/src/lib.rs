#![forbid(unsafe_code)]

pub mod indicator;
pub mod model;
pub mod quiz;
pub mod time;
pub mod titration;

pub use time::Clock;
