pub mod hearts;
pub mod model;
pub mod recommend;
pub mod rules;
pub mod scoring;
pub mod streak;
pub mod time;

pub use time::Clock;
