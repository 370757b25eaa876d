pub mod configuration;
pub mod controller;
pub mod data_capture;
pub mod decoding;
pub mod error_handling;
pub mod query;
pub mod storage;

pub use controller::Controller;
