//! CPU die temperature through the Ryzen Master Monitoring SDK.
//!
//! The SDK only talks to the CPU while its kernel driver service is running,
//! so [`CpuMonitor::init`] checks the service before touching the platform.

#[cfg(test)]
mod fake;

status_enum! {
    pub enum InitStatus {
        Success = 0 => "success",
        DriverNotInstalled = 1 => "driver is not installed",
        PlatformInitFailed = 2 => "failed to init platform",
        CpuNotFound = 3 => "cpu not found",
    }
}

status_enum! {
    pub enum TemperatureStatus {
        NotInitialized = 0 => "Ryzen monitoring not initialized",
        UnknownError = 1 => "Failure",
        Success = 2 => "Success",
        InvalidValue = 3 => "Invalid value",
        NotImplemented = 4 => "Method is not implemented by the BIOS",
        CoresParked = 5 => "Cores are already parked. First Enable all the cores",
        Unsupported = 6 => "Unsupported Function",
    }
}

const VENDOR_RESULTS: [(i32, TemperatureStatus); 6] = [
    (-1, TemperatureStatus::UnknownError),
    (0, TemperatureStatus::Success),
    (1, TemperatureStatus::InvalidValue),
    (2, TemperatureStatus::NotImplemented),
    (3, TemperatureStatus::CoresParked),
    (4, TemperatureStatus::Unsupported),
];

impl TemperatureStatus {
    /// Maps a result code returned by the SDK. Codes the SDK does not
    /// document map to [`TemperatureStatus::UnknownError`].
    pub fn from_vendor(code: i32) -> Self {
        VENDOR_RESULTS
            .iter()
            .find(|(vendor, _)| *vendor == code)
            .map_or(Self::UnknownError, |&(_, status)| status)
    }
}

pub fn init_status_to_str(code: i32) -> &'static str {
    InitStatus::code_to_str(code)
}

pub fn temperature_status_to_str(code: i32) -> &'static str {
    TemperatureStatus::code_to_str(code)
}

/// Snapshot returned by one CPU parameter query.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CpuParameters {
    /// Raw SDK result code, see [`TemperatureStatus::from_vendor`].
    pub result: i32,
    pub temperature: f64,
}

/// The SDK platform object.
pub trait RyzenPlatform {
    type Cpu: Copy;

    fn init(&mut self) -> bool;
    fn uninit(&mut self);
    fn cpu(&mut self, index: u32) -> Option<Self::Cpu>;
    fn cpu_parameters(&mut self, cpu: Self::Cpu) -> CpuParameters;
}

pub trait DriverProbe {
    fn driver_running(&self) -> bool;
}

/// Checks the SDK driver through the OS service manager.
#[derive(Debug, Clone)]
pub struct ServiceProbe {
    service: String,
}

impl ServiceProbe {
    pub fn new<S: Into<String>>(service: S) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl DriverProbe for ServiceProbe {
    fn driver_running(&self) -> bool {
        crate::platform::service_running(&self.service)
    }
}

/// One Ryzen Master monitoring session bound to the first CPU device.
pub struct CpuMonitor<P: RyzenPlatform, D: DriverProbe = ServiceProbe> {
    platform: P,
    probe: D,
    cpu: Option<P::Cpu>,
}

#[cfg(all(
    target_os = "windows",
    target_arch = "x86_64",
    feature = "ryzen-sdk"
))]
impl CpuMonitor<crate::platform::SdkPlatform, ServiceProbe> {
    pub fn open(config: &crate::Config) -> Result<Self, InitStatus> {
        let mut monitor = Self::new(
            crate::platform::SdkPlatform::new(config.ryzen_sdk_dir.clone()),
            ServiceProbe::new(config.driver_service.clone()),
        );
        monitor.init()?;
        Ok(monitor)
    }
}

impl<P: RyzenPlatform, D: DriverProbe> CpuMonitor<P, D> {
    pub fn new(platform: P, probe: D) -> Self {
        Self {
            platform,
            probe,
            cpu: None,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn init(&mut self) -> Result<(), InitStatus> {
        if self.cpu.is_some() {
            tracing::debug!("Ryzen session already active");
            return Ok(());
        }

        if !self.probe.driver_running() {
            tracing::warn!("Ryzen Master driver service is not running");
            return Err(InitStatus::DriverNotInstalled);
        }
        if !self.platform.init() {
            tracing::warn!("Ryzen Master platform init failed");
            return Err(InitStatus::PlatformInitFailed);
        }

        match self.platform.cpu(0) {
            Some(cpu) => {
                tracing::info!("Ryzen monitoring started");
                self.cpu = Some(cpu);
                Ok(())
            }
            None => {
                tracing::warn!("no CPU device at index 0");
                self.platform.uninit();
                Err(InitStatus::CpuNotFound)
            }
        }
    }

    pub fn quit(&mut self) {
        if self.cpu.take().is_some() {
            self.platform.uninit();
            tracing::debug!("Ryzen monitoring stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.cpu.is_some()
    }

    /// Reads the CPU die temperature in degrees Celsius.
    pub fn temperature(&mut self) -> Result<f64, TemperatureStatus> {
        let cpu = self.cpu.ok_or(TemperatureStatus::NotInitialized)?;
        let params = self.platform.cpu_parameters(cpu);
        match TemperatureStatus::from_vendor(params.result) {
            TemperatureStatus::Success => Ok(params.temperature),
            status => {
                tracing::debug!(result = params.result, %status, "CPU parameter query failed");
                Err(status)
            }
        }
    }
}

impl<P: RyzenPlatform, D: DriverProbe> Drop for CpuMonitor<P, D> {
    fn drop(&mut self) {
        self.quit();
    }
}
