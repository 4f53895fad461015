use std::ffi::{c_char, c_int, c_void, CStr};
use std::{fmt, mem};

pub const ADL_OK: c_int = 0;
pub const ADL_MAX_PATH: usize = 256;
pub const ADL_PMLOG_MAX_SENSORS: usize = 256;
pub const PMLOG_TEMPERATURE_EDGE: usize = 8;

pub type MallocCallback = extern "system" fn(c_int) -> *mut c_void;

/// Opaque `ADL_CONTEXT_HANDLE`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AdlContext(pub *mut c_void);

/// Non-zero return code of an ADL entry point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AdlStatus(pub c_int);

impl AdlStatus {
    pub fn check(code: c_int) -> AdlResult<()> {
        if code == ADL_OK {
            Ok(())
        } else {
            Err(AdlStatus(code))
        }
    }
}

impl fmt::Display for AdlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADL error {}", self.0)
    }
}

pub type AdlResult<T> = Result<T, AdlStatus>;

#[allow(non_snake_case)]
#[derive(Copy, Clone)]
#[repr(C)]
pub struct AdapterInfo {
    pub iSize: c_int,
    pub iAdapterIndex: c_int,
    pub strUDID: [c_char; ADL_MAX_PATH],
    pub iBusNumber: c_int,
    pub iDeviceNumber: c_int,
    pub iFunctionNumber: c_int,
    pub iVendorID: c_int,
    pub strAdapterName: [c_char; ADL_MAX_PATH],
    pub strDisplayName: [c_char; ADL_MAX_PATH],
    pub iPresent: c_int,
    #[cfg(target_os = "windows")]
    pub iExist: c_int,
    #[cfg(target_os = "windows")]
    pub strDriverPath: [c_char; ADL_MAX_PATH],
    #[cfg(target_os = "windows")]
    pub strDriverPathExt: [c_char; ADL_MAX_PATH],
    #[cfg(target_os = "windows")]
    pub strPNPString: [c_char; ADL_MAX_PATH],
    #[cfg(target_os = "windows")]
    pub iOSDisplayIndex: c_int,
    #[cfg(not(target_os = "windows"))]
    pub iXScreenNum: c_int,
    #[cfg(not(target_os = "windows"))]
    pub iDrvIndex: c_int,
    #[cfg(not(target_os = "windows"))]
    pub strXScreenConfigName: [c_char; ADL_MAX_PATH],
}

impl AdapterInfo {
    pub fn zeroed() -> Self {
        // Plain integers and byte arrays only.
        unsafe { mem::zeroed() }
    }

    pub fn adapter_name(&self) -> String {
        c_chars_to_string(&self.strAdapterName)
    }

    pub fn display_name(&self) -> String {
        c_chars_to_string(&self.strDisplayName)
    }

    pub fn udid(&self) -> String {
        c_chars_to_string(&self.strUDID)
    }
}

impl fmt::Debug for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterInfo")
            .field("index", &self.iAdapterIndex)
            .field("name", &self.adapter_name())
            .field("display", &self.display_name())
            .field("bus", &self.iBusNumber)
            .field("vendor", &self.iVendorID)
            .field("present", &self.iPresent)
            .finish()
    }
}

fn c_chars_to_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().map(|&c| c as u8).collect();
    match CStr::from_bytes_until_nul(&bytes) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct AdlTemperature {
    pub iSize: c_int,
    /// Milli-degrees Celsius.
    pub iTemperature: c_int,
}

#[derive(Debug, Copy, Clone, Default)]
#[repr(C)]
pub struct SingleSensorData {
    pub supported: c_int,
    pub value: c_int,
}

#[derive(Copy, Clone)]
#[repr(C)]
pub struct PmLogDataOutput {
    pub size: c_int,
    pub sensors: [SingleSensorData; ADL_PMLOG_MAX_SENSORS],
}

impl PmLogDataOutput {
    pub fn zeroed() -> Self {
        Self {
            size: mem::size_of::<Self>() as c_int,
            sensors: [SingleSensorData::default(); ADL_PMLOG_MAX_SENSORS],
        }
    }

    pub fn edge_temperature(&self) -> SingleSensorData {
        self.sensors[PMLOG_TEMPERATURE_EDGE]
    }
}

impl fmt::Debug for PmLogDataOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PmLogDataOutput")
            .field("size", &self.size)
            .field("edge", &self.edge_temperature())
            .finish()
    }
}

/// Sensor selector for `ADL2_OverdriveN_Temperature_Get`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum OdnTemperatureType {
    Core = 1,
    Memory = 2,
    VrmCore = 3,
    VrmMemory = 4,
    Liquid = 5,
    Plx = 6,
    Hotspot = 7,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OverdriveCaps {
    pub supported: bool,
    pub enabled: bool,
    pub version: c_int,
}
