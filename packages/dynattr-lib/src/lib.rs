//! # dynattr-lib
//!
//! `dynattr-lib` is a collection of utilities used by the various `dynattr-*` crates.

pub mod config;
pub mod defaults;
pub mod utils;
