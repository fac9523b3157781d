//! Recognition engines.
//!
//! Each engine wraps one external recognition capability behind the
//! [`RecognitionWorker`] trait:
//! - [`CommandWorker`] runs a local executable against the stored blob
//! - [`HttpWorker`] posts the image bytes to a remote service
//!
//! The [`EngineRegistry`] maps engine names to workers and is built once
//! from configuration.

mod command;
mod http;
mod registry;
mod worker;

pub use command::{CommandWorker, PATH_PLACEHOLDER};
pub use http::HttpWorker;
pub use registry::{EngineRegistry, EngineSelector};
pub use worker::{recognize, RecognitionWorker};
