//! Bindings to the C++ interfaces declared in the Monitoring SDK's
//! `IPlatform.h`, `IDeviceManager.h` and `ICPUEx.h`.
//!
//! The vtable slot of `GetCPUParameters` and the `CPUParameters` layout below
//! follow the declaration order of those headers and are not verified against
//! a particular SDK release, so this module only builds with the `ryzen-sdk`
//! feature.

use crate::ryzen::{CpuParameters, RyzenPlatform};
use libloading::os::windows::{Library as WinLibrary, LOAD_WITH_ALTERED_SEARCH_PATH};
use std::ffi::{c_int, c_uint, c_void};
use std::path::PathBuf;
use std::ptr::NonNull;

const PLATFORM_DLL: &str = "Platform.dll";
const DEVICE_TYPE_CPU: c_int = 0;
// Position of GetCPUParameters in the ICPUEx vtable, after the IDevice slots.
const GET_CPU_PARAMETERS_SLOT: usize = 6;

type GetPlatform = unsafe extern "C" fn() -> *mut IPlatform;
type GetCpuParameters = unsafe extern "C" fn(*mut ICpuEx, *mut RawCpuParameters) -> c_int;

#[repr(C)]
struct IPlatformVtbl {
    init: unsafe extern "C" fn(*mut IPlatform) -> bool,
    uninit: unsafe extern "C" fn(*mut IPlatform) -> bool,
    get_device_manager: unsafe extern "C" fn(*mut IPlatform) -> *mut IDeviceManager,
}

#[repr(C)]
struct IPlatform {
    vtbl: *const IPlatformVtbl,
}

#[repr(C)]
struct IDeviceManagerVtbl {
    get_device: unsafe extern "C" fn(*mut IDeviceManager, c_int, c_uint) -> *mut ICpuEx,
}

#[repr(C)]
struct IDeviceManager {
    vtbl: *const IDeviceManagerVtbl,
}

#[repr(C)]
struct ICpuEx {
    vtbl: *const *const c_void,
}

#[allow(dead_code)]
#[repr(C)]
struct EffectiveFreqData {
    length: c_uint,
    freq: *mut f64,
    state: *mut f64,
}

#[allow(dead_code)]
#[repr(C)]
struct RawCpuParameters {
    mode: c_uint,
    freq_data: EffectiveFreqData,
    ppt_limit: f64,
    ppt_value: f64,
    edc_limit_vdd: f64,
    edc_value_vdd: f64,
    tdc_limit_vdd: f64,
    tdc_value_vdd: f64,
    edc_limit_soc: f64,
    edc_value_soc: f64,
    tdc_limit_soc: f64,
    tdc_value_soc: f64,
    chtc_limit: f64,
    fclk_p0_freq: f64,
    cclk_fmax: f64,
    vddcr_vdd_power: f64,
    vddcr_soc_power: f64,
    peak_core_voltage: f64,
    avg_core_voltage: f64,
    soc_voltage: f64,
    temperature: f64,
    peak_speed: f64,
    reserved: [u8; 256],
}

#[derive(Debug, Copy, Clone)]
pub struct CpuDevice(NonNull<ICpuEx>);

/// Ryzen Master Monitoring SDK loaded from its install directory.
///
/// The library is loaded on the first `init` and stays loaded for the
/// lifetime of this value; the SDK keeps process-wide singletons.
pub struct SdkPlatform {
    dir: PathBuf,
    platform: Option<NonNull<IPlatform>>,
    lib: Option<libloading::Library>,
}

impl SdkPlatform {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            platform: None,
            lib: None,
        }
    }

    fn platform(&mut self) -> Result<NonNull<IPlatform>, libloading::Error> {
        if let Some(platform) = self.platform {
            return Ok(platform);
        }

        unsafe {
            if self.lib.is_none() {
                let path = self.dir.join(PLATFORM_DLL);
                let lib = WinLibrary::load_with_flags(&path, LOAD_WITH_ALTERED_SEARCH_PATH)?;
                self.lib = Some(lib.into());
            }
            let lib = self.lib.as_ref().ok_or(libloading::Error::DlOpenUnknown)?;

            let get_platform = match lib.get::<GetPlatform>(b"GetPlatform\0") {
                Ok(symbol) => *symbol,
                Err(_) => *lib.get::<GetPlatform>(b"?GetPlatform@@YAAEAVIPlatform@@XZ\0")?,
            };
            let platform = NonNull::new(get_platform()).ok_or(libloading::Error::DlSymUnknown)?;
            self.platform = Some(platform);
            Ok(platform)
        }
    }
}

impl RyzenPlatform for SdkPlatform {
    type Cpu = CpuDevice;

    fn init(&mut self) -> bool {
        match self.platform() {
            Ok(platform) => unsafe { ((*platform.as_ref().vtbl).init)(platform.as_ptr()) },
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), %err, "failed to load Ryzen Master SDK");
                false
            }
        }
    }

    fn uninit(&mut self) {
        if let Some(platform) = self.platform {
            unsafe {
                ((*platform.as_ref().vtbl).uninit)(platform.as_ptr());
            }
        }
    }

    fn cpu(&mut self, index: u32) -> Option<CpuDevice> {
        let platform = self.platform?;
        unsafe {
            let manager = ((*platform.as_ref().vtbl).get_device_manager)(platform.as_ptr());
            let manager = NonNull::new(manager)?;
            let device =
                ((*manager.as_ref().vtbl).get_device)(manager.as_ptr(), DEVICE_TYPE_CPU, index);
            NonNull::new(device).map(CpuDevice)
        }
    }

    fn cpu_parameters(&mut self, cpu: CpuDevice) -> CpuParameters {
        unsafe {
            let mut raw: RawCpuParameters = std::mem::zeroed();
            let slot = *(*cpu.0.as_ref()).vtbl.add(GET_CPU_PARAMETERS_SLOT);
            let get_cpu_parameters: GetCpuParameters = std::mem::transmute(slot);
            let result = get_cpu_parameters(cpu.0.as_ptr(), &mut raw);
            CpuParameters {
                result,
                temperature: raw.temperature,
            }
        }
    }
}
