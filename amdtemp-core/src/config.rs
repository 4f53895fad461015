use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[cfg(target_os = "windows")]
const ADL_LIBRARY: &str = "atiadlxx.dll";
#[cfg(not(target_os = "windows"))]
const ADL_LIBRARY: &str = "libatiadlxx.so";

const RYZEN_SDK_DIR: &str = r"C:\Program Files\AMD\RyzenMasterMonitoringSDK\bin";
const RYZEN_DRIVER_SERVICE: &str = "AMDRyzenMasterDriverV16";

/// Where to find the vendor runtimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// ADL library name or path, resolved by the OS loader.
    pub adl_library: PathBuf,
    /// Directory holding the Ryzen Master Monitoring SDK binaries.
    pub ryzen_sdk_dir: PathBuf,
    /// Kernel driver service that must be running before the SDK is used.
    pub driver_service: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adl_library: PathBuf::from(ADL_LIBRARY),
            ryzen_sdk_dir: PathBuf::from(RYZEN_SDK_DIR),
            driver_service: RYZEN_DRIVER_SERVICE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_name_vendor_runtimes() {
        let config = Config::default();
        assert_eq!(config.driver_service, "AMDRyzenMasterDriverV16");
        assert!(config
            .adl_library
            .to_string_lossy()
            .contains("atiadlxx"));
    }
}
