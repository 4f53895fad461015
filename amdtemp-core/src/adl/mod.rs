//! GPU temperatures through the AMD Display Library.
//!
//! Every adapter reports the overdrive API generation it supports once, at
//! [`GpuMonitor::init`]. Temperature reads dispatch on that recorded
//! generation, so a query is always exactly one vendor call.

pub use library::{adl_main_memory_alloc, adl_main_memory_free, AdlLibrary, DynamicLoader};
pub use types::*;

#[cfg(test)]
mod fake;
mod library;
mod types;

use serde::Serialize;
use std::ffi::c_int;

status_enum! {
    pub enum InitStatus {
        Success = 0 => "Success",
        LoadLibraryFailed = 1 => "Failed to load ADL library",
        LibraryFunctionsNotFound = 2 => "Required library functions not found",
        MainControlCreateFailed = 3 => "ADL2_Main_Control_Create failed",
        GetNumberOfAdaptersFailed = 4 => "ADL2_Adapter_NumberOfAdapters_Get failed",
        NoGPUFound = 5 => "No GPU has been detected",
        GetAdapterInfoFailed = 6 => "ADL2_Adapter_AdapterInfo_Get failed",
    }
}

status_enum! {
    pub enum TemperatureStatus {
        Success = 0 => "Success",
        GetVersionFailed = 1 => "Failed to retrieve API version of this device",
        NotSupported = 2 => "This function is not supported on this device",
        Disabled = 3 => "This function is disabled on this device",
        GetTemperatureFailed = 4 => "Failed to retrieve value from temperature sensor",
        UnknownVersion = 5 => "Unrecognized overdrive API version",
        AdapterNotFound = 6 => "No adapter with this index",
    }
}

pub fn init_status_to_str(code: i32) -> &'static str {
    InitStatus::code_to_str(code)
}

pub fn temperature_status_to_str(code: i32) -> &'static str {
    TemperatureStatus::code_to_str(code)
}

/// Entry points of the ADL2 API used for temperature monitoring.
///
/// Every method is one vendor call. A non-zero vendor return code is surfaced
/// as [`AdlStatus`] without interpretation.
pub trait AdlApi {
    fn main_control_create(
        &self,
        callback: MallocCallback,
        connected_only: bool,
    ) -> AdlResult<AdlContext>;
    fn main_control_destroy(&self, context: AdlContext) -> AdlResult<()>;
    fn number_of_adapters(&self, context: AdlContext) -> AdlResult<c_int>;
    fn adapter_info(&self, context: AdlContext, buffer: &mut [AdapterInfo]) -> AdlResult<()>;
    fn overdrive_caps(&self, context: AdlContext, adapter: c_int) -> AdlResult<OverdriveCaps>;
    fn overdrive5_temperature(
        &self,
        context: AdlContext,
        adapter: c_int,
        thermal_controller: c_int,
    ) -> AdlResult<AdlTemperature>;
    fn overdrive6_temperature(&self, context: AdlContext, adapter: c_int) -> AdlResult<c_int>;
    fn overdrive_n_temperature(
        &self,
        context: AdlContext,
        adapter: c_int,
        kind: OdnTemperatureType,
    ) -> AdlResult<c_int>;
    fn pmlog_data(&self, context: AdlContext, adapter: c_int) -> AdlResult<PmLogDataOutput>;
}

/// Produces a fresh [`AdlApi`] for each monitoring session.
pub trait AdlLoader {
    type Api: AdlApi;

    fn load(&self) -> Result<Self::Api, InitStatus>;
}

/// Sensor access protocol an adapter supports, detected once at init.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum SensorGeneration {
    DetectionFailed,
    NotSupported,
    Disabled,
    Overdrive5,
    Overdrive6,
    /// Overdrive N, reported by the driver as version 7.
    OverdriveN,
    /// PM log sensor table, reported as version 8.
    PmLog,
    Unknown(c_int),
}

impl SensorGeneration {
    pub fn detect(caps: AdlResult<OverdriveCaps>) -> Self {
        match caps {
            Err(_) => Self::DetectionFailed,
            Ok(caps) if !caps.supported => Self::NotSupported,
            Ok(caps) if !caps.enabled => Self::Disabled,
            Ok(caps) => match caps.version {
                5 => Self::Overdrive5,
                6 => Self::Overdrive6,
                7 => Self::OverdriveN,
                8 => Self::PmLog,
                v => Self::Unknown(v),
            },
        }
    }

    /// The integer the driver uses for this generation, with 0, -1 and -2
    /// standing for detection failure, unsupported and disabled.
    pub fn sentinel(self) -> c_int {
        match self {
            Self::DetectionFailed => 0,
            Self::NotSupported => -1,
            Self::Disabled => -2,
            Self::Overdrive5 => 5,
            Self::Overdrive6 => 6,
            Self::OverdriveN => 7,
            Self::PmLog => 8,
            Self::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdapterRecord {
    info: AdapterInfo,
    generation: SensorGeneration,
}

impl AdapterRecord {
    pub fn info(&self) -> &AdapterInfo {
        &self.info
    }

    pub fn generation(&self) -> SensorGeneration {
        self.generation
    }

    pub fn name(&self) -> String {
        self.info.adapter_name()
    }

    pub fn display_name(&self) -> String {
        self.info.display_name()
    }

    pub fn udid(&self) -> String {
        self.info.udid()
    }

    pub fn bus_number(&self) -> i32 {
        self.info.iBusNumber
    }

    pub fn vendor_id(&self) -> i32 {
        self.info.iVendorID
    }

    pub fn present(&self) -> bool {
        self.info.iPresent != 0
    }
}

/// Indices of the adapters worth sampling.
///
/// ADL lists one logical adapter per display output, so only the first
/// present adapter on each PCI bus is kept.
pub fn physical_adapters(adapters: &[AdapterRecord]) -> Vec<usize> {
    let mut buses = vec![];
    let mut physical = vec![];
    for (idx, adapter) in adapters.iter().enumerate() {
        if !adapter.present() || buses.contains(&adapter.bus_number()) {
            continue;
        }
        buses.push(adapter.bus_number());
        physical.push(idx);
    }
    physical
}

struct Session<A: AdlApi> {
    api: A,
    context: AdlContext,
    adapters: Vec<AdapterRecord>,
}

impl<A: AdlApi> Session<A> {
    fn open(api: A) -> Result<Self, InitStatus> {
        let context = api
            .main_control_create(adl_main_memory_alloc, true)
            .map_err(|status| {
                tracing::warn!(%status, "ADL2_Main_Control_Create failed");
                InitStatus::MainControlCreateFailed
            })?;

        let mut session = Self {
            api,
            context,
            adapters: vec![],
        };
        // Dropping `session` on error destroys the context.
        session.adapters = session.enumerate()?;
        Ok(session)
    }

    fn enumerate(&self) -> Result<Vec<AdapterRecord>, InitStatus> {
        let count = self.api.number_of_adapters(self.context).map_err(|status| {
            tracing::warn!(%status, "ADL2_Adapter_NumberOfAdapters_Get failed");
            InitStatus::GetNumberOfAdaptersFailed
        })?;
        if count < 1 {
            return Err(InitStatus::NoGPUFound);
        }

        let mut infos = vec![AdapterInfo::zeroed(); count as usize];
        self.api
            .adapter_info(self.context, &mut infos)
            .map_err(|status| {
                tracing::warn!(%status, "ADL2_Adapter_AdapterInfo_Get failed");
                InitStatus::GetAdapterInfoFailed
            })?;

        Ok(infos
            .into_iter()
            .enumerate()
            .map(|(idx, info)| {
                let generation =
                    SensorGeneration::detect(self.api.overdrive_caps(self.context, idx as c_int));
                tracing::debug!(idx, name = %info.adapter_name(), ?generation, "adapter detected");
                AdapterRecord { info, generation }
            })
            .collect())
    }

    fn temperature(&self, idx: usize) -> Result<f32, TemperatureStatus> {
        let adapter = self
            .adapters
            .get(idx)
            .ok_or(TemperatureStatus::AdapterNotFound)?;
        let (api, context, idx) = (&self.api, self.context, idx as c_int);
        let failed = |status: AdlStatus| {
            tracing::debug!(idx, %status, "temperature read failed");
            TemperatureStatus::GetTemperatureFailed
        };

        match adapter.generation {
            SensorGeneration::DetectionFailed => Err(TemperatureStatus::GetVersionFailed),
            SensorGeneration::NotSupported => Err(TemperatureStatus::NotSupported),
            SensorGeneration::Disabled => Err(TemperatureStatus::Disabled),
            SensorGeneration::Overdrive5 => {
                let temperature = api.overdrive5_temperature(context, idx, 0).map_err(failed)?;
                Ok(temperature.iTemperature as f32 / 1000.)
            }
            SensorGeneration::Overdrive6 => {
                let milli = api.overdrive6_temperature(context, idx).map_err(failed)?;
                Ok(milli as f32 / 1000.)
            }
            SensorGeneration::OverdriveN => {
                let milli = api
                    .overdrive_n_temperature(context, idx, OdnTemperatureType::Core)
                    .map_err(failed)?;
                Ok(milli as f32 / 1000.)
            }
            SensorGeneration::PmLog => {
                let edge = api.pmlog_data(context, idx).map_err(failed)?.edge_temperature();
                if edge.supported == 0 {
                    return Err(TemperatureStatus::NotSupported);
                }
                Ok(edge.value as f32)
            }
            SensorGeneration::Unknown(_) => Err(TemperatureStatus::UnknownVersion),
        }
    }
}

impl<A: AdlApi> Drop for Session<A> {
    fn drop(&mut self) {
        if let Err(status) = self.api.main_control_destroy(self.context) {
            tracing::warn!(%status, "ADL2_Main_Control_Destroy failed");
        }
    }
}

/// One ADL monitoring session.
///
/// The monitor starts inactive. [`init`](Self::init) loads the library and
/// enumerates adapters; [`quit`](Self::quit) or dropping the monitor destroys
/// the vendor context and unloads the library.
pub struct GpuMonitor<L: AdlLoader = DynamicLoader> {
    loader: L,
    session: Option<Session<L::Api>>,
}

impl GpuMonitor<DynamicLoader> {
    pub fn open(config: &crate::Config) -> Result<Self, InitStatus> {
        let mut monitor = Self::new(DynamicLoader::new(config.adl_library.clone()));
        monitor.init()?;
        Ok(monitor)
    }
}

impl<L: AdlLoader> GpuMonitor<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            session: None,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn init(&mut self) -> Result<(), InitStatus> {
        if self.session.is_some() {
            tracing::debug!("ADL session already active");
            return Ok(());
        }

        let api = self.loader.load()?;
        let session = Session::open(api)?;
        tracing::info!(adapters = session.adapters.len(), "ADL monitoring started");
        self.session = Some(session);
        Ok(())
    }

    pub fn quit(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("ADL monitoring stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters().len()
    }

    pub fn adapter_info(&self, idx: usize) -> Option<&AdapterRecord> {
        self.adapters().get(idx)
    }

    pub fn adapters(&self) -> &[AdapterRecord] {
        self.session
            .as_ref()
            .map(|s| s.adapters.as_slice())
            .unwrap_or_default()
    }

    /// Reads the adapter's temperature in degrees Celsius.
    pub fn temperature(&self, idx: usize) -> Result<f32, TemperatureStatus> {
        self.session
            .as_ref()
            .ok_or(TemperatureStatus::AdapterNotFound)?
            .temperature(idx)
    }
}

impl<L: AdlLoader> Drop for GpuMonitor<L> {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{FakeAdl, FakeLoader};
    use super::*;
    use std::ffi::c_int;

    fn caps(version: c_int) -> AdlResult<OverdriveCaps> {
        Ok(OverdriveCaps {
            supported: true,
            enabled: true,
            version,
        })
    }

    fn monitor_with(adl: FakeAdl) -> GpuMonitor<FakeLoader> {
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl));
        monitor.init().unwrap();
        monitor
    }

    #[test]
    fn status_strings() {
        for status in InitStatus::ALL {
            assert!(!init_status_to_str(status.code()).is_empty());
            assert_ne!(init_status_to_str(status.code()), crate::INVALID_STATUS);
        }
        for status in TemperatureStatus::ALL {
            assert!(!temperature_status_to_str(status.code()).is_empty());
            assert_ne!(temperature_status_to_str(status.code()), crate::INVALID_STATUS);
        }
        assert_eq!(init_status_to_str(0), "Success");
        assert_eq!(init_status_to_str(5), "No GPU has been detected");
        assert_eq!(
            temperature_status_to_str(3),
            "This function is disabled on this device"
        );
        assert_eq!(init_status_to_str(7), crate::INVALID_STATUS);
        assert_eq!(init_status_to_str(-1), crate::INVALID_STATUS);
        assert_eq!(temperature_status_to_str(42), crate::INVALID_STATUS);
    }

    #[test]
    fn generation_detection() {
        let unsupported = Ok(OverdriveCaps {
            supported: false,
            enabled: true,
            version: 7,
        });
        let disabled = Ok(OverdriveCaps {
            supported: true,
            enabled: false,
            version: 7,
        });

        let detect = SensorGeneration::detect;
        assert_eq!(detect(Err(AdlStatus(-1))), SensorGeneration::DetectionFailed);
        assert_eq!(detect(unsupported), SensorGeneration::NotSupported);
        assert_eq!(detect(disabled), SensorGeneration::Disabled);
        assert_eq!(detect(caps(5)), SensorGeneration::Overdrive5);
        assert_eq!(detect(caps(6)), SensorGeneration::Overdrive6);
        assert_eq!(detect(caps(7)), SensorGeneration::OverdriveN);
        assert_eq!(detect(caps(8)), SensorGeneration::PmLog);
        assert_eq!(detect(caps(9)), SensorGeneration::Unknown(9));

        assert_eq!(SensorGeneration::DetectionFailed.sentinel(), 0);
        assert_eq!(SensorGeneration::NotSupported.sentinel(), -1);
        assert_eq!(SensorGeneration::Disabled.sentinel(), -2);
        assert_eq!(SensorGeneration::PmLog.sentinel(), 8);
    }

    #[test]
    fn adapter_count_follows_lifecycle() {
        let adl = FakeAdl::with_adapters(vec![caps(5), caps(6), caps(8)]);
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl.clone()));
        assert_eq!(monitor.adapter_count(), 0);
        assert!(monitor.adapter_info(0).is_none());

        monitor.init().unwrap();
        assert_eq!(monitor.adapter_count(), 3);
        for idx in 0..3 {
            assert!(monitor.adapter_info(idx).is_some());
        }
        assert!(monitor.adapter_info(3).is_none());
        assert!(monitor.adapter_info(usize::MAX).is_none());
        assert_eq!(
            monitor.adapter_info(2).unwrap().generation(),
            SensorGeneration::PmLog
        );

        monitor.quit();
        assert_eq!(monitor.adapter_count(), 0);
        assert_eq!(adl.destroyed(), 1);
    }

    #[test]
    fn adapter_identity_is_decoded() {
        let adl = FakeAdl::with_adapters(vec![caps(6)]).named(0, "AMD Radeon RX 6800");
        let monitor = monitor_with(adl);
        let record = monitor.adapter_info(0).unwrap();
        assert_eq!(record.name(), "AMD Radeon RX 6800");
        assert_eq!(record.vendor_id(), 1002);
        assert!(record.present());
    }

    #[test]
    fn outputs_of_one_card_collapse() {
        let adl = FakeAdl::with_adapters(vec![caps(8), caps(8), caps(8), caps(6), caps(6)])
            .on_bus(1, 0)
            .on_bus(2, 0)
            .absent(3);
        let monitor = monitor_with(adl);
        assert_eq!(monitor.adapter_count(), 5);
        assert_eq!(physical_adapters(monitor.adapters()), vec![0, 4]);
        assert!(physical_adapters(&[]).is_empty());
    }

    #[test]
    fn sentinel_generations_fail_without_reading() {
        let unsupported = Ok(OverdriveCaps {
            supported: false,
            enabled: false,
            version: 0,
        });
        let disabled = Ok(OverdriveCaps {
            supported: true,
            enabled: false,
            version: 0,
        });
        let adl = FakeAdl::with_adapters(vec![Err(AdlStatus(-8)), unsupported, disabled]);
        let monitor = monitor_with(adl.clone());

        assert_eq!(
            monitor.temperature(0),
            Err(TemperatureStatus::GetVersionFailed)
        );
        assert_eq!(monitor.temperature(1), Err(TemperatureStatus::NotSupported));
        assert_eq!(monitor.temperature(2), Err(TemperatureStatus::Disabled));
        assert_eq!(adl.temperature_reads(), 0);
    }

    #[test]
    fn milli_degree_generations_are_scaled() {
        let adl = FakeAdl::with_adapters(vec![caps(5), caps(6), caps(7)]).reading(45000);
        let monitor = monitor_with(adl.clone());

        for idx in 0..3 {
            assert_eq!(monitor.temperature(idx), Ok(45.0));
        }
        assert_eq!(adl.temperature_reads(), 3);
        assert_eq!(adl.odn_kinds(), vec![OdnTemperatureType::Core]);
    }

    #[test]
    fn pmlog_edge_slot() {
        let adl = FakeAdl::with_adapters(vec![caps(8)]).edge(false, 0);
        let monitor = monitor_with(adl);
        assert_eq!(monitor.temperature(0), Err(TemperatureStatus::NotSupported));

        let adl = FakeAdl::with_adapters(vec![caps(8)]).edge(true, 62);
        let monitor = monitor_with(adl);
        assert_eq!(monitor.temperature(0), Ok(62.0));
    }

    #[test]
    fn vendor_failure_is_reported() {
        let adl = FakeAdl::with_adapters(vec![caps(5), caps(6), caps(7), caps(8)]).failing_reads();
        let monitor = monitor_with(adl);
        for idx in 0..4 {
            assert_eq!(
                monitor.temperature(idx),
                Err(TemperatureStatus::GetTemperatureFailed)
            );
        }
    }

    #[test]
    fn unknown_version_is_an_error() {
        let monitor = monitor_with(FakeAdl::with_adapters(vec![caps(9)]).reading(45000));
        assert_eq!(monitor.temperature(0), Err(TemperatureStatus::UnknownVersion));
    }

    #[test]
    fn out_of_range_or_inactive_adapter() {
        let mut monitor = monitor_with(FakeAdl::with_adapters(vec![caps(6)]).reading(40000));
        assert_eq!(monitor.temperature(1), Err(TemperatureStatus::AdapterNotFound));
        monitor.quit();
        assert_eq!(monitor.temperature(0), Err(TemperatureStatus::AdapterNotFound));
    }

    #[test]
    fn init_failures() {
        let mut monitor = GpuMonitor::new(FakeLoader::failing(InitStatus::LoadLibraryFailed));
        assert_eq!(monitor.init(), Err(InitStatus::LoadLibraryFailed));
        let mut monitor =
            GpuMonitor::new(FakeLoader::failing(InitStatus::LibraryFunctionsNotFound));
        assert_eq!(monitor.init(), Err(InitStatus::LibraryFunctionsNotFound));

        let adl = FakeAdl::with_adapters(vec![caps(6)]).failing_create();
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl.clone()));
        assert_eq!(monitor.init(), Err(InitStatus::MainControlCreateFailed));
        assert_eq!(adl.destroyed(), 0);

        let adl = FakeAdl::with_adapters(vec![caps(6)]).failing_count();
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl.clone()));
        assert_eq!(monitor.init(), Err(InitStatus::GetNumberOfAdaptersFailed));
        assert_eq!(adl.destroyed(), 1);

        let adl = FakeAdl::with_adapters(vec![]);
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl.clone()));
        assert_eq!(monitor.init(), Err(InitStatus::NoGPUFound));
        assert_eq!(adl.destroyed(), 1);

        let adl = FakeAdl::with_adapters(vec![caps(6)]).failing_info();
        let mut monitor = GpuMonitor::new(FakeLoader::new(adl.clone()));
        assert_eq!(monitor.init(), Err(InitStatus::GetAdapterInfoFailed));
        assert_eq!(adl.destroyed(), 1);
        assert!(!monitor.is_active());
        assert_eq!(monitor.adapter_count(), 0);
    }

    #[test]
    fn quit_twice_and_drop() {
        let adl = FakeAdl::with_adapters(vec![caps(6)]);
        let mut monitor = monitor_with(adl.clone());
        monitor.quit();
        monitor.quit();
        drop(monitor);
        assert_eq!(adl.destroyed(), 1);

        let mut never_started = GpuMonitor::new(FakeLoader::new(adl.clone()));
        never_started.quit();
        never_started.quit();
        assert_eq!(adl.destroyed(), 1);
    }

    #[test]
    fn init_is_not_repeated_while_active() {
        let adl = FakeAdl::with_adapters(vec![caps(6)]);
        let mut monitor = monitor_with(adl.clone());
        monitor.init().unwrap();
        assert_eq!(adl.created(), 1);

        monitor.quit();
        monitor.init().unwrap();
        assert_eq!(adl.created(), 2);
        assert_eq!(adl.destroyed(), 1);
    }
}
