/// Kernel driver services only exist on Windows.
pub fn service_running(name: &str) -> bool {
    tracing::debug!(name, "no service manager on this platform");
    false
}
