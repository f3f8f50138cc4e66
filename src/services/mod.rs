pub mod notification_bridge;
pub mod platform;

pub use notification_bridge::NotificationBridge;
pub use platform::WindowPlatform;

use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Платформенные сервисы одного режима: примитивы ОС и согласованный с ними мост уведомлений
pub struct PlatformServices {
    pub platform: Arc<dyn WindowPlatform>,
    pub bridge: Box<dyn NotificationBridge>,
}

/// Factory function to create matching platform services based on the dry_run flag
pub fn create_platform_services(config: &Config, dry_run: bool) -> Result<PlatformServices> {
    if dry_run {
        info!("Dry-run режим - используется виртуальный рабочий стол");
        let platform = Arc::new(platform::SimulatedPlatform::from_config(
            &config.simulation,
            &config.target.process_name,
        ));
        let bridge = notification_bridge::SimulatedBridge::new(
            platform.clone(),
            config.simulation.perturb_interval_ms,
        );
        return Ok(PlatformServices {
            platform,
            bridge: Box::new(bridge),
        });
    }

    create_native_services()
}

#[cfg(target_os = "windows")]
fn create_native_services() -> Result<PlatformServices> {
    info!("Используются Win32 API");
    Ok(PlatformServices {
        platform: Arc::new(platform::win32::Win32Platform::new()),
        bridge: Box::new(notification_bridge::win32::Win32Bridge::new()),
    })
}

#[cfg(not(target_os = "windows"))]
fn create_native_services() -> Result<PlatformServices> {
    Err(crate::pin_error!(
        service_unavailable,
        "управление окнами поддерживается только в Windows; запустите с --dry-run"
    ))
}
