//! HTTP surface for courserec

pub mod rest;

pub use rest::{ApiState, RestApi};
