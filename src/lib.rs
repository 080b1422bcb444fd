pub mod baseline;
pub mod config;
pub mod correction;
pub mod error;
pub mod pose;
pub mod progression;
pub mod scoring;
pub mod session;
