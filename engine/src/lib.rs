pub mod enums;
pub mod model;
pub mod runtime;
pub mod service;

pub use model::bundle::BundleJob;
pub use runtime::{
    channel::{BUNDLES_CHANNEL, BundleChannel},
    metrics::{METRICS, Metrics},
};
pub use service::{
    builder::{build_processes, build_services},
    factory::ServiceFactory,
    traits::{Ingest, PipelineService, Sender, Validatable},
};
