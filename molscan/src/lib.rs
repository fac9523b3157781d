pub mod api;
pub mod codec;
pub mod config;
pub mod engines;
pub mod error;
pub mod models;
pub mod recognition;
pub mod storage;
