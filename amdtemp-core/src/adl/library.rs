use super::types::*;
use super::{AdlApi, AdlLoader, InitStatus};
use std::alloc::{self, Layout};
use std::ffi::{c_int, c_void};
use std::path::{Path, PathBuf};
use std::{mem, ptr};

type MainControlCreate = unsafe extern "C" fn(MallocCallback, c_int, *mut *mut c_void) -> c_int;
type MainControlDestroy = unsafe extern "C" fn(*mut c_void) -> c_int;
type NumberOfAdaptersGet = unsafe extern "C" fn(*mut c_void, *mut c_int) -> c_int;
type AdapterInfoGet = unsafe extern "C" fn(*mut c_void, *mut AdapterInfo, c_int) -> c_int;
type OverdriveCapsGet =
    unsafe extern "C" fn(*mut c_void, c_int, *mut c_int, *mut c_int, *mut c_int) -> c_int;
type Overdrive5TemperatureGet =
    unsafe extern "C" fn(*mut c_void, c_int, c_int, *mut AdlTemperature) -> c_int;
type Overdrive6TemperatureGet = unsafe extern "C" fn(*mut c_void, c_int, *mut c_int) -> c_int;
type OverdriveNTemperatureGet =
    unsafe extern "C" fn(*mut c_void, c_int, c_int, *mut c_int) -> c_int;
type QueryPmLogDataGet = unsafe extern "C" fn(*mut c_void, c_int, *mut PmLogDataOutput) -> c_int;

/// ADL resolved from a shared library at runtime.
pub struct AdlLibrary {
    main_control_create: MainControlCreate,
    main_control_destroy: MainControlDestroy,
    number_of_adapters_get: NumberOfAdaptersGet,
    adapter_info_get: AdapterInfoGet,
    overdrive_caps: OverdriveCapsGet,
    overdrive5_temperature_get: Overdrive5TemperatureGet,
    overdrive6_temperature_get: Overdrive6TemperatureGet,
    overdrive_n_temperature_get: OverdriveNTemperatureGet,
    query_pmlog_data_get: QueryPmLogDataGet,
    // Keeps every pointer above valid.
    _lib: libloading::Library,
}

impl AdlLibrary {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, InitStatus> {
        let path = path.as_ref();
        unsafe {
            let lib = libloading::Library::new(path).map_err(|err| {
                tracing::warn!(path = %path.display(), %err, "failed to load ADL");
                InitStatus::LoadLibraryFailed
            })?;

            match Self::resolve(lib) {
                Ok(adl) => Ok(adl),
                Err(err) => {
                    tracing::warn!(%err, "ADL entry point missing");
                    Err(InitStatus::LibraryFunctionsNotFound)
                }
            }
        }
    }

    unsafe fn resolve(lib: libloading::Library) -> Result<Self, libloading::Error> {
        let main_control_create = *lib.get::<MainControlCreate>(b"ADL2_Main_Control_Create\0")?;
        let main_control_destroy =
            *lib.get::<MainControlDestroy>(b"ADL2_Main_Control_Destroy\0")?;
        let number_of_adapters_get =
            *lib.get::<NumberOfAdaptersGet>(b"ADL2_Adapter_NumberOfAdapters_Get\0")?;
        let adapter_info_get = *lib.get::<AdapterInfoGet>(b"ADL2_Adapter_AdapterInfo_Get\0")?;
        let overdrive_caps = *lib.get::<OverdriveCapsGet>(b"ADL2_Overdrive_Caps\0")?;
        let overdrive5_temperature_get =
            *lib.get::<Overdrive5TemperatureGet>(b"ADL2_Overdrive5_Temperature_Get\0")?;
        let overdrive6_temperature_get =
            *lib.get::<Overdrive6TemperatureGet>(b"ADL2_Overdrive6_Temperature_Get\0")?;
        let overdrive_n_temperature_get =
            *lib.get::<OverdriveNTemperatureGet>(b"ADL2_OverdriveN_Temperature_Get\0")?;
        let query_pmlog_data_get =
            *lib.get::<QueryPmLogDataGet>(b"ADL2_New_QueryPMLogData_Get\0")?;

        Ok(Self {
            main_control_create,
            main_control_destroy,
            number_of_adapters_get,
            adapter_info_get,
            overdrive_caps,
            overdrive5_temperature_get,
            overdrive6_temperature_get,
            overdrive_n_temperature_get,
            query_pmlog_data_get,
            _lib: lib,
        })
    }
}

impl AdlApi for AdlLibrary {
    fn main_control_create(
        &self,
        callback: MallocCallback,
        connected_only: bool,
    ) -> AdlResult<AdlContext> {
        let mut context = ptr::null_mut();
        AdlStatus::check(unsafe {
            (self.main_control_create)(callback, connected_only as c_int, &mut context)
        })?;
        Ok(AdlContext(context))
    }

    fn main_control_destroy(&self, context: AdlContext) -> AdlResult<()> {
        AdlStatus::check(unsafe { (self.main_control_destroy)(context.0) })
    }

    fn number_of_adapters(&self, context: AdlContext) -> AdlResult<c_int> {
        let mut count = 0;
        AdlStatus::check(unsafe { (self.number_of_adapters_get)(context.0, &mut count) })?;
        Ok(count)
    }

    fn adapter_info(&self, context: AdlContext, buffer: &mut [AdapterInfo]) -> AdlResult<()> {
        let size = mem::size_of_val(buffer) as c_int;
        AdlStatus::check(unsafe { (self.adapter_info_get)(context.0, buffer.as_mut_ptr(), size) })
    }

    fn overdrive_caps(&self, context: AdlContext, adapter: c_int) -> AdlResult<OverdriveCaps> {
        let (mut supported, mut enabled, mut version) = (0, 0, 0);
        AdlStatus::check(unsafe {
            (self.overdrive_caps)(
                context.0,
                adapter,
                &mut supported,
                &mut enabled,
                &mut version,
            )
        })?;
        Ok(OverdriveCaps {
            supported: supported != 0,
            enabled: enabled != 0,
            version,
        })
    }

    fn overdrive5_temperature(
        &self,
        context: AdlContext,
        adapter: c_int,
        thermal_controller: c_int,
    ) -> AdlResult<AdlTemperature> {
        let mut temperature = AdlTemperature {
            iSize: mem::size_of::<AdlTemperature>() as c_int,
            iTemperature: 0,
        };
        AdlStatus::check(unsafe {
            (self.overdrive5_temperature_get)(
                context.0,
                adapter,
                thermal_controller,
                &mut temperature,
            )
        })?;
        Ok(temperature)
    }

    fn overdrive6_temperature(&self, context: AdlContext, adapter: c_int) -> AdlResult<c_int> {
        let mut temperature = 0;
        AdlStatus::check(unsafe {
            (self.overdrive6_temperature_get)(context.0, adapter, &mut temperature)
        })?;
        Ok(temperature)
    }

    fn overdrive_n_temperature(
        &self,
        context: AdlContext,
        adapter: c_int,
        kind: OdnTemperatureType,
    ) -> AdlResult<c_int> {
        let mut temperature = 0;
        AdlStatus::check(unsafe {
            (self.overdrive_n_temperature_get)(context.0, adapter, kind as c_int, &mut temperature)
        })?;
        Ok(temperature)
    }

    fn pmlog_data(&self, context: AdlContext, adapter: c_int) -> AdlResult<PmLogDataOutput> {
        let mut output = PmLogDataOutput::zeroed();
        AdlStatus::check(unsafe { (self.query_pmlog_data_get)(context.0, adapter, &mut output) })?;
        Ok(output)
    }
}

/// Loads [`AdlLibrary`] from a configurable path on every `init`.
#[derive(Debug, Clone)]
pub struct DynamicLoader {
    path: PathBuf,
}

impl DynamicLoader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl AdlLoader for DynamicLoader {
    type Api = AdlLibrary;

    fn load(&self) -> Result<AdlLibrary, InitStatus> {
        AdlLibrary::open(&self.path)
    }
}

const ALLOC_HEADER: usize = 16;

/// Allocation callback handed to `ADL2_Main_Control_Create`.
///
/// The requested size is stored in a header in front of the returned block so
/// that [`adl_main_memory_free`] can rebuild the layout.
pub extern "system" fn adl_main_memory_alloc(size: c_int) -> *mut c_void {
    let Ok(size) = usize::try_from(size) else {
        return ptr::null_mut();
    };
    let Ok(layout) = Layout::from_size_align(size + ALLOC_HEADER, ALLOC_HEADER) else {
        return ptr::null_mut();
    };
    unsafe {
        let base = alloc::alloc(layout);
        if base.is_null() {
            return ptr::null_mut();
        }
        (base as *mut usize).write(size);
        base.add(ALLOC_HEADER) as *mut c_void
    }
}

/// Releases a buffer the library allocated through [`adl_main_memory_alloc`]
/// and nulls the caller's pointer.
///
/// # Safety
///
/// `buffer` must be null or point to a pointer that is null or was returned by
/// [`adl_main_memory_alloc`] and not yet freed.
pub unsafe extern "system" fn adl_main_memory_free(buffer: *mut *mut c_void) {
    if buffer.is_null() || (*buffer).is_null() {
        return;
    }
    let base = (*buffer as *mut u8).sub(ALLOC_HEADER);
    let size = (base as *const usize).read();
    alloc::dealloc(
        base,
        Layout::from_size_align_unchecked(size + ALLOC_HEADER, ALLOC_HEADER),
    );
    *buffer = ptr::null_mut();
}
