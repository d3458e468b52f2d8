pub mod engine;
pub mod indicators;
pub mod normalize;

#[cfg(test)]
mod indicators_tests;

pub use engine::*;
pub use indicators::*;
pub use normalize::*;
