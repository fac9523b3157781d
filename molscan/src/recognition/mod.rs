//! Recognition coordination: parallel dispatch to the engines, aggregation
//! of their outcomes and the single-flight request cache in front of both.

mod aggregator;
mod cache;
mod dispatcher;
mod service;

pub use aggregator::aggregate;
pub use cache::RequestCache;
pub use dispatcher::Dispatcher;
pub use service::RecognitionService;
