#[cfg(target_os = "windows")]
pub use self::windows::service_running;
#[cfg(all(
    target_os = "windows",
    target_arch = "x86_64",
    feature = "ryzen-sdk"
))]
pub use self::windows::SdkPlatform;
#[cfg(not(target_os = "windows"))]
pub use fallback::service_running;

#[cfg(not(target_os = "windows"))]
mod fallback;
#[cfg(target_os = "windows")]
pub mod windows;
