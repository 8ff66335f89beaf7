//! Readiness wait for freshly inserted devices

use std::time::Duration;

use tracing::debug;

use crate::daw::Device;

/// Wait until `device` exists, at most `timeout`
///
/// Returns whether the device became addressable. Callers go ahead on
/// timeout anyway: writes to an absent device are no-ops.
pub async fn wait_until_exists(device: &dyn Device, timeout: Duration) -> bool {
    let mut exists = device.watch_exists();
    if *exists.borrow_and_update() {
        return true;
    }

    let ready = match tokio::time::timeout(timeout, exists.wait_for(|e| *e)).await {
        Ok(Ok(_)) => true,
        Ok(Err(_)) => {
            debug!("Device handle dropped while waiting for readiness");
            false
        }
        Err(_) => {
            debug!(?timeout, "Device not ready before timeout");
            false
        }
    };
    ready
}
