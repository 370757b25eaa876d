//! Error types shared by the capture and query sides.

pub mod types;
