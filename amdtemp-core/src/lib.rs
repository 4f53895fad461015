pub use config::Config;
pub use system::{Features, System};

#[macro_use]
mod status;

pub mod adl;
mod config;
pub mod platform;
pub mod ryzen;
mod system;

/// Returned by the `*_status_to_str` lookups for codes outside a taxonomy.
pub const INVALID_STATUS: &str = "<invalid>";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Feature {0:?} missing")]
    FeatureMissing(Features),
    #[error("Unsupported features: {0:?}")]
    UnsupportedFeatures(Features),
    #[error("GPU monitoring unavailable: {0}")]
    Gpu(#[from] adl::InitStatus),
    #[error("CPU monitoring unavailable: {0}")]
    Cpu(#[from] ryzen::InitStatus),
    #[error("GPU temperature: {0}")]
    GpuTemperature(#[from] adl::TemperatureStatus),
    #[error("CPU temperature: {0}")]
    CpuTemperature(#[from] ryzen::TemperatureStatus),
}
