pub mod builder;
pub mod instructions;
pub mod registry;
pub mod relay;

pub use builder::{Bundle, BundleBuilder, BundleError, validate_bundle};
pub use registry::BundleRegistry;
pub use relay::{RelayClient, RelayError};
