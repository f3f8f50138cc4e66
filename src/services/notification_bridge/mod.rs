//! NotificationBridge service: responsibility and boundaries
//!
//! This module and its submodules ONLY deliver location/size/parent change
//! notifications for windows of the tracked process. Filtering by exact window
//! handle and every placement decision happen in `placement`.

pub mod simulated;
mod r#trait;
#[cfg(target_os = "windows")]
pub mod win32;

pub use self::r#trait::NotificationBridge;
pub use simulated::SimulatedBridge;
