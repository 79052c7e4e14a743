#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;

pub mod accumulator;
pub mod api;
pub mod envelope;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod publisher;
pub mod rescheduler;
pub mod source;
pub mod walker;

pub use api::Error;
