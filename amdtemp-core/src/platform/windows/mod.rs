#[cfg(all(target_arch = "x86_64", feature = "ryzen-sdk"))]
mod ryzen_sdk;

#[cfg(all(target_arch = "x86_64", feature = "ryzen-sdk"))]
pub use ryzen_sdk::SdkPlatform;

use windows::core::{HSTRING, PCWSTR};
use windows::Win32::Security::SC_HANDLE;
use windows::Win32::System::Services;

struct ServiceHandle(SC_HANDLE);

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if !unsafe { Services::CloseServiceHandle(self.0) }.as_bool() {
            tracing::warn!("CloseServiceHandle failed");
        }
    }
}

/// Whether the named service exists and is in the running state.
///
/// Every failure along the way (no access to the service manager, unknown
/// service, status query failure) counts as not running.
pub fn service_running(name: &str) -> bool {
    unsafe {
        let manager = match Services::OpenSCManagerW(
            PCWSTR::null(),
            PCWSTR::null(),
            Services::SC_MANAGER_CONNECT,
        ) {
            Ok(handle) => ServiceHandle(handle),
            Err(err) => {
                tracing::debug!(%err, "OpenSCManagerW failed");
                return false;
            }
        };

        let service = match Services::OpenServiceW(
            manager.0,
            &HSTRING::from(name),
            Services::SERVICE_QUERY_STATUS,
        ) {
            Ok(handle) => ServiceHandle(handle),
            Err(err) => {
                tracing::debug!(name, %err, "OpenServiceW failed");
                return false;
            }
        };

        let mut status = Services::SERVICE_STATUS::default();
        if !Services::QueryServiceStatus(service.0, &mut status).as_bool() {
            tracing::debug!(name, "QueryServiceStatus failed");
            return false;
        }

        status.dwCurrentState == Services::SERVICE_RUNNING
    }
}
